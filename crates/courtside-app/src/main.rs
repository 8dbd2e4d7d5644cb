// Courtside entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config (copying defaults on first run)
// 3. Open database and run one grade refresh
// 4. Print a one-line summary

use courtside_app::{init_tracing, run_refresh};
use courtside_core::config;

use anyhow::Context;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let base_dir = std::env::current_dir().context("failed to resolve working directory")?;

    // 1. Initialize tracing
    init_tracing(&base_dir)?;
    info!("Courtside starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: season={}, snapshots={}, {} fetch attempts",
        config.season.label, config.sources.snapshot_dir, config.retry.max_attempts
    );

    // 3. Refresh
    let summary = match run_refresh(&config, &base_dir).await {
        Ok(summary) => summary,
        Err(e) => {
            error!("Grade refresh failed: {e:#}");
            return Err(e);
        }
    };

    // 4. Summary
    println!(
        "Graded {} players for {} ({} archetypes)",
        summary.players,
        summary.season,
        summary.archetypes.len()
    );
    info!("Courtside shut down cleanly");
    Ok(())
}
