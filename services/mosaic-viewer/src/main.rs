//! Headless mosaic viewer.
//!
//! Loads sensor profiles and a directory catalog of per-cell records, runs
//! a navigation script and prints each published event with the resulting
//! snapshot as a JSON line on stdout. Logs go to stderr.

use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mosaic_cache::{
    Collaborators, DirectorySource, MetadataSource, MosaicConfig, NavigationController,
    SensorProfile,
};
use mosaic_common::PlateCarree;
use mosaic_viewer::{parse_script, HeadlessRasterLoader, ScriptRunner};

#[derive(Parser, Debug)]
#[command(name = "mosaic-viewer")]
#[command(about = "Run a navigation script against a scene mosaic catalog")]
struct Args {
    /// Directory of sensor profile YAML files
    #[arg(long, env = "MOSAIC_PROFILES_DIR", default_value = "config/sensors")]
    profiles: PathBuf,

    /// Catalog root containing <sensor>/<col>_<row>.txt records
    #[arg(long, env = "MOSAIC_CATALOG_DIR", default_value = "data/catalog")]
    catalog: PathBuf,

    /// Sensor to start with (default: first profile by name)
    #[arg(short, long, env = "MOSAIC_SENSOR")]
    sensor: Option<String>,

    /// Script file (default: read stdin)
    #[arg(long)]
    script: Option<PathBuf>,

    /// Seconds to wait for a load to finish before giving up
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs);

    let profiles = SensorProfile::load_dir(&args.profiles)
        .with_context(|| format!("failed to load profiles from {}", args.profiles.display()))?;
    let profile = match &args.sensor {
        Some(name) => profiles
            .iter()
            .find(|p| &p.name == name)
            .cloned()
            .with_context(|| format!("no profile named '{}'", name))?,
        None => match profiles.first() {
            Some(p) => p.clone(),
            None => bail!("no sensor profiles in {}", args.profiles.display()),
        },
    };
    info!(
        sensors = ?profiles.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        sensor = %profile.name,
        "Loaded sensor profiles"
    );

    let script_text = match &args.script {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?,
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read script from stdin")?;
            text
        }
    };
    let script = parse_script(&script_text)?;
    info!(commands = script.len(), "Parsed script");

    let config = MosaicConfig::from_env();
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;

    let source: Arc<dyn MetadataSource> = Arc::new(DirectorySource::new(&args.catalog));
    let raster = Arc::new(HeadlessRasterLoader::new());
    let controller = Arc::new(NavigationController::new(
        config,
        profile,
        Collaborators {
            source: Arc::clone(&source),
            raster: raster.clone(),
            projection: Arc::new(PlateCarree::default()),
        },
    )?);

    let mut runner = ScriptRunner::new(
        controller,
        profiles,
        source,
        io::stdout().lock(),
        Duration::from_secs(args.timeout_secs),
    );
    let summary = runner.run(&script).await?;

    info!(
        summary = %serde_json::to_string(&summary)?,
        rasters = %serde_json::to_string(&raster.stats())?,
        "Done"
    );
    Ok(())
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
