//! Headless driver for the mosaic engine.
//!
//! Reads a navigation script, runs it against a [`NavigationController`]
//! backed by an on-disk catalog and writes every published event with the
//! resulting snapshot as one JSON line.
//!
//! [`NavigationController`]: mosaic_cache::NavigationController

pub mod display;
pub mod runner;
pub mod script;

pub use display::HeadlessRasterLoader;
pub use runner::{RunSummary, ScriptRunner};
pub use script::{parse_script, Command, ScriptError, ScriptLine};
