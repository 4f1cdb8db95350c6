use anyhow::{Context, Result};
use tracing::info;

use constituent_roster::{logging, Pipeline, PipelineConfig};

/// Optional overrides for source locations and output paths
const CONFIG_FILE: &str = "etl.json";

fn main() -> Result<()> {
    logging::init_logging();
    info!(version = constituent_roster::VERSION, "starting constituent roster run");

    let config = PipelineConfig::load_or_default(CONFIG_FILE)
        .with_context(|| format!("Failed to load {}", CONFIG_FILE))?;

    let summary = Pipeline::new(config)
        .run()
        .context("Roster pipeline failed")?;

    info!(run_id = %summary.run_id, "done");
    Ok(())
}
