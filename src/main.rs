use anyhow::{Context, Result};
use multi_sim::{BatchRunner, HarnessConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CONFIG_FILE: &str = "multi_sim.toml";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = HarnessConfig::load_or_default(CONFIG_FILE)
        .with_context(|| format!("failed to load {}", CONFIG_FILE))?;
    info!(
        trials = config.batch.trial_count,
        output_dir = %config.batch.output_dir.display(),
        "configuration loaded"
    );

    let runner = BatchRunner::new(config).context("invalid configuration")?;
    let report = runner.run().context("batch aborted")?;

    if !report.failures.is_empty() {
        warn!(
            failed = report.failures.len(),
            completed = report.completed,
            seed = report.seed,
            "some trials did not complete"
        );
    }

    Ok(())
}
