//! Executes a parsed script against a controller.

use crate::script::{Command, FilterChange, ScriptLine};
use anyhow::{bail, Context, Result};
use mosaic_cache::{
    FilterCriteria, LoaderStatsSnapshot, MetadataSource, MosaicEvent, MoveOutcome,
    NavigationController, SensorProfile, ShowSceneOutcome,
};
use serde::Serialize;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

/// Totals for one script run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub commands: usize,
    /// Commands the engine declined (cannot move, hidden scene, ...)
    pub refused: usize,
    pub events: usize,
    pub lagged: u64,
    pub loader: LoaderStatsSnapshot,
}

/// Runs scripts and writes one JSON line per published event.
pub struct ScriptRunner<W: Write> {
    controller: Arc<NavigationController>,
    profiles: Vec<SensorProfile>,
    source: Arc<dyn MetadataSource>,
    events: broadcast::Receiver<MosaicEvent>,
    out: W,
    idle_timeout: Duration,
}

impl<W: Write> ScriptRunner<W> {
    /// `profiles` are the sensors a `sensor` command may switch to; all
    /// of them read from `source`.
    pub fn new(
        controller: Arc<NavigationController>,
        profiles: Vec<SensorProfile>,
        source: Arc<dyn MetadataSource>,
        out: W,
        idle_timeout: Duration,
    ) -> Self {
        let events = controller.subscribe();
        Self {
            controller,
            profiles,
            source,
            events,
            out,
            idle_timeout,
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub async fn run(&mut self, script: &[ScriptLine]) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for step in script {
            summary.commands += 1;
            let accepted = self.execute(&step.command)?;
            if !accepted {
                summary.refused += 1;
            }
            if !step.background || matches!(step.command, Command::Wait) {
                self.wait_idle(step.line).await?;
            }
            self.drain(step.line, &mut summary)?;
        }

        // Background loads still running at the end of the script
        let last = script.last().map(|s| s.line).unwrap_or(0);
        self.wait_idle(last).await?;
        self.drain(last, &mut summary)?;

        summary.loader = self.controller.stats();
        info!(
            commands = summary.commands,
            refused = summary.refused,
            events = summary.events,
            "Script finished"
        );
        Ok(summary)
    }

    /// Apply one command. Returns false when the engine declined it.
    fn execute(&self, command: &Command) -> Result<bool> {
        let controller = &self.controller;
        debug!(?command, "Executing");
        let accepted = match command {
            Command::Goto { col, row } => moved(controller.goto_grid_cell(*col, *row)),
            Command::GotoLatLong { lat, lon } => moved(controller.goto_lat_long(*lat, *lon)),
            Command::GotoXy { x, y } => moved(controller.goto_projected_xy(*x, *y)),
            Command::Scroll { east, south } => moved(controller.scroll(*east, *south)),
            Command::Show(key) => shown(controller.show_scene(key)),
            Command::Select(key) => shown(controller.select_scene(key)),
            Command::SelectCell(slot) => controller.select_cell(*slot),
            Command::Step(step) => controller.step_date(*step),
            Command::Filter(change) => {
                controller.set_filters(apply_filter_change(controller.filters(), change));
                true
            }
            Command::Hide(key) => {
                controller.hide_scene(key);
                true
            }
            Command::UnhideAll => {
                controller.unhide_all();
                true
            }
            Command::Resolution(index) => controller.set_resolution(*index).is_ok(),
            Command::Refresh => moved(controller.refresh()),
            Command::Sensor(name) => {
                let Some(profile) = self.profiles.iter().find(|p| &p.name == name) else {
                    bail!("unknown sensor '{}'", name);
                };
                moved(controller.set_sensor(profile.clone(), Arc::clone(&self.source))?)
            }
            Command::Cancel => controller.cancel_load(),
            Command::Wait => true,
        };
        if !accepted {
            warn!(?command, "Command refused");
        }
        Ok(accepted)
    }

    async fn wait_idle(&self, line: usize) -> Result<()> {
        let controller = Arc::clone(&self.controller);
        let timeout = self.idle_timeout;
        let idle = tokio::task::spawn_blocking(move || controller.wait_until_idle_timeout(timeout))
            .await
            .context("idle wait task failed")?;
        if !idle {
            bail!("line {}: loader still busy after {:?}", line, timeout);
        }
        Ok(())
    }

    /// Write every pending event with a fresh snapshot.
    fn drain(&mut self, line: usize, summary: &mut RunSummary) -> Result<()> {
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    summary.events += 1;
                    let record = json!({
                        "line": line,
                        "event": event,
                        "snapshot": self.controller.snapshot(),
                    });
                    serde_json::to_writer(&mut self.out, &record)
                        .context("failed to encode event")?;
                    writeln!(self.out).context("failed to write event")?;
                }
                Err(TryRecvError::Lagged(n)) => {
                    warn!(missed = n, "Event receiver lagged");
                    summary.lagged += n;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        self.out.flush().context("failed to flush output")?;
        Ok(())
    }
}

fn moved(outcome: MoveOutcome) -> bool {
    if let MoveOutcome::CannotMove(reason) = outcome {
        debug!(?reason, "Cannot move");
    }
    outcome.is_requested()
}

fn shown(outcome: ShowSceneOutcome) -> bool {
    matches!(
        outcome,
        ShowSceneOutcome::Selected | ShowSceneOutcome::Navigating
    )
}

/// The criteria after applying a `filter` command to `current`.
pub fn apply_filter_change(current: FilterCriteria, change: &FilterChange) -> FilterCriteria {
    match change {
        FilterChange::MaxCloudCover(max) => FilterCriteria {
            max_cloud_cover: *max,
            ..current
        },
        FilterChange::MinQuality(min) => FilterCriteria {
            min_quality: *min,
            ..current
        },
        FilterChange::Months(start, end) => FilterCriteria {
            start: *start,
            end: *end,
            ..current
        },
        // Hidden scenes survive a reset; `unhide` clears them
        FilterChange::Reset => FilterCriteria {
            hidden: current.hidden,
            ..FilterCriteria::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_cache::SceneKey;
    use mosaic_common::{GridCoord, YearMonth};

    #[test]
    fn test_filter_changes_keep_other_fields() {
        let current = FilterCriteria {
            min_quality: 5,
            ..FilterCriteria::default()
        };
        let next = apply_filter_change(current, &FilterChange::MaxCloudCover(20));
        assert_eq!(next.max_cloud_cover, 20);
        assert_eq!(next.min_quality, 5);

        let next = apply_filter_change(
            next,
            &FilterChange::Months(YearMonth::new(2020, 3), YearMonth::new(2020, 4)),
        );
        assert_eq!(next.start, YearMonth::new(2020, 3));
        assert_eq!(next.max_cloud_cover, 20);
    }

    #[test]
    fn test_reset_keeps_hidden_scenes() {
        let mut current = FilterCriteria {
            max_cloud_cover: 10,
            ..FilterCriteria::default()
        };
        current
            .hidden
            .insert(SceneKey::new(GridCoord::new(1, 1), "X"));
        let next = apply_filter_change(current, &FilterChange::Reset);
        assert_eq!(next.max_cloud_cover, 100);
        assert_eq!(next.hidden.len(), 1);
    }
}
