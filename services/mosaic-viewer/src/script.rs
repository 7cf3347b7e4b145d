//! Navigation script parsing.
//!
//! One command per line, `#` starts a comment:
//!
//! ```text
//! goto 10 20              # grid cell
//! latlon -10.5 20.25      # lat/long
//! xy 1113200 -2226400     # projected coordinate
//! scroll 1 0              # east, south steps
//! show 10 20 LT50100202   # scene by cell and entity id
//! select 10 20 LT50100202
//! cell 4                  # window slot
//! newer | older
//! filter cloud 30
//! filter quality 7
//! filter months 2020-01 2020-06
//! filter reset
//! hide 10 20 LT50100202
//! unhide
//! resolution 1
//! refresh
//! sensor other_sensor
//! cancel
//! wait
//! ```
//!
//! A trailing `&` submits the command without waiting for the loader to go
//! idle.

use mosaic_cache::{DateStep, SceneKey};
use mosaic_common::{GridCoord, YearMonth};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ScriptError {
    #[error("line {line}: unknown command '{command}'")]
    UnknownCommand { line: usize, command: String },

    #[error("line {line}: '{command}' expects {expected}")]
    BadArguments {
        line: usize,
        command: String,
        expected: &'static str,
    },
}

pub type ScriptResult<T> = Result<T, ScriptError>;

/// How a `filter` command changes the current criteria.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterChange {
    MaxCloudCover(u8),
    MinQuality(u8),
    Months(YearMonth, YearMonth),
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Goto { col: i32, row: i32 },
    GotoLatLong { lat: f64, lon: f64 },
    GotoXy { x: f64, y: f64 },
    Scroll { east: i32, south: i32 },
    Show(SceneKey),
    Select(SceneKey),
    SelectCell(usize),
    Step(DateStep),
    Filter(FilterChange),
    Hide(SceneKey),
    UnhideAll,
    Resolution(usize),
    Refresh,
    Sensor(String),
    Cancel,
    Wait,
}

impl Command {
    /// Whether the command may start a metadata load.
    pub fn starts_load(&self) -> bool {
        matches!(
            self,
            Command::Goto { .. }
                | Command::GotoLatLong { .. }
                | Command::GotoXy { .. }
                | Command::Scroll { .. }
                | Command::Show(_)
                | Command::Resolution(_)
                | Command::Refresh
                | Command::Sensor(_)
        )
    }
}

/// A parsed script line.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLine {
    /// 1-based line number in the source text
    pub line: usize,
    pub command: Command,
    /// Submit without waiting for the loader
    pub background: bool,
}

/// Parse a whole script, skipping blank lines and comments.
pub fn parse_script(text: &str) -> ScriptResult<Vec<ScriptLine>> {
    let mut lines = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        let (content, background) = match content.strip_suffix('&') {
            Some(rest) => (rest.trim_end(), true),
            None => (content, false),
        };
        lines.push(ScriptLine {
            line: idx + 1,
            command: parse_command(content, idx + 1)?,
            background,
        });
    }
    Ok(lines)
}

/// Parse a single command without comment or `&` handling.
pub fn parse_command(content: &str, line: usize) -> ScriptResult<Command> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    let Some((&name, args)) = parts.split_first() else {
        return Err(ScriptError::UnknownCommand {
            line,
            command: String::new(),
        });
    };
    let bad = |expected: &'static str| ScriptError::BadArguments {
        line,
        command: name.to_string(),
        expected,
    };

    let command = match name {
        "goto" => {
            let [col, row] = numbers::<i32, 2>(args).ok_or_else(|| bad("<col> <row>"))?;
            Command::Goto { col, row }
        }
        "latlon" => {
            let [lat, lon] = numbers::<f64, 2>(args).ok_or_else(|| bad("<lat> <lon>"))?;
            Command::GotoLatLong { lat, lon }
        }
        "xy" => {
            let [x, y] = numbers::<f64, 2>(args).ok_or_else(|| bad("<x> <y>"))?;
            Command::GotoXy { x, y }
        }
        "scroll" => {
            let [east, south] = numbers::<i32, 2>(args).ok_or_else(|| bad("<east> <south>"))?;
            Command::Scroll { east, south }
        }
        "show" | "select" | "hide" => {
            let key = scene_key(args).ok_or_else(|| bad("<col> <row> <entity id>"))?;
            match name {
                "show" => Command::Show(key),
                "select" => Command::Select(key),
                _ => Command::Hide(key),
            }
        }
        "cell" => {
            let [slot] = numbers::<usize, 1>(args).ok_or_else(|| bad("<slot>"))?;
            Command::SelectCell(slot)
        }
        "newer" if args.is_empty() => Command::Step(DateStep::Newer),
        "older" if args.is_empty() => Command::Step(DateStep::Older),
        "filter" => Command::Filter(parse_filter(args).ok_or_else(|| {
            bad("cloud <max> | quality <min> | months <YYYY-MM> <YYYY-MM> | reset")
        })?),
        "unhide" if args.is_empty() => Command::UnhideAll,
        "resolution" => {
            let [index] = numbers::<usize, 1>(args).ok_or_else(|| bad("<index>"))?;
            Command::Resolution(index)
        }
        "refresh" if args.is_empty() => Command::Refresh,
        "sensor" => match args {
            [sensor] => Command::Sensor(sensor.to_string()),
            _ => return Err(bad("<sensor name>")),
        },
        "cancel" if args.is_empty() => Command::Cancel,
        "wait" if args.is_empty() => Command::Wait,
        "newer" | "older" | "unhide" | "refresh" | "cancel" | "wait" => {
            return Err(bad("no arguments"))
        }
        _ => {
            return Err(ScriptError::UnknownCommand {
                line,
                command: name.to_string(),
            })
        }
    };
    Ok(command)
}

/// Parse exactly `N` numeric arguments.
fn numbers<T: std::str::FromStr + Copy + Default, const N: usize>(args: &[&str]) -> Option<[T; N]> {
    if args.len() != N {
        return None;
    }
    let mut out = [T::default(); N];
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = arg.parse().ok()?;
    }
    Some(out)
}

fn scene_key(args: &[&str]) -> Option<SceneKey> {
    match args {
        [col, row, entity] => Some(SceneKey::new(
            GridCoord::new(col.parse().ok()?, row.parse().ok()?),
            *entity,
        )),
        _ => None,
    }
}

fn parse_filter(args: &[&str]) -> Option<FilterChange> {
    match args {
        ["cloud", max] => max.parse().ok().map(FilterChange::MaxCloudCover),
        ["quality", min] => min.parse().ok().map(FilterChange::MinQuality),
        ["months", start, end] => Some(FilterChange::Months(year_month(start)?, year_month(end)?)),
        ["reset"] => Some(FilterChange::Reset),
        _ => None,
    }
}

/// Parse `YYYY-MM`.
fn year_month(s: &str) -> Option<YearMonth> {
    let (year, month) = s.split_once('-')?;
    let month: u32 = month.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some(YearMonth::new(year.parse().ok()?, month))
}
