//! Sliding-window mosaic cache for tiled satellite imagery.
//!
//! Provides:
//! - Scene and cell metadata with the per-cell record parser
//! - Sensor profiles loaded from YAML
//! - Visibility filters, default scene picking and swath grouping
//! - The paint-order stack
//! - A background loader with single-flight, cancellable window loads
//! - [`NavigationController`], the façade tying it together

pub mod cell;
pub mod config;
pub mod events;
pub mod filter;
pub mod loader;
pub mod navigation;
pub mod picker;
pub mod profile;
pub mod raster;
pub mod record;
pub mod scene;
pub mod source;
mod state;
pub mod swath;
pub mod window;
pub mod zorder;

pub use cell::{Cell, DateStep};
pub use config::MosaicConfig;
pub use events::{MosaicEvent, MosaicSnapshot};
pub use filter::{AreaSelector, FilterCriteria, FilterReason};
pub use loader::{LoadKind, LoaderStatsSnapshot};
pub use navigation::{CannotMove, Collaborators, MoveOutcome, NavigationController, ShowSceneOutcome};
pub use picker::{pick_default, rating, DateCache};
pub use profile::{RecordLayout, Resolution, SensorProfile};
pub use raster::{NullRasterLoader, RasterLoader};
pub use record::parse_cell_record;
pub use scene::{CornerOffsets, Scene, SceneKey};
pub use source::{DirectorySource, MetadataSource};
pub use swath::{build_swath, Swath, SwathKey};
pub use window::GridWindow;
pub use zorder::{StackMode, ZOrderStack};
