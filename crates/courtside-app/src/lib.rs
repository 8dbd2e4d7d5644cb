// Application wiring: tracing setup and a single grade refresh run built
// from the loaded configuration.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local, Utc};
use courtside_core::config::Config;
use courtside_core::db::Database;
use courtside_grades::pipeline::{refresh_grades, RunSummary};
use courtside_grades::source::{CsvSnapshotSource, RetryingSource};
use tracing::info;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "courtside=info,warn";

/// Log file name inside the `logs/` directory.
pub const LOG_FILE: &str = "courtside.log";

/// Initialize tracing to write to `<base_dir>/logs/courtside.log`.
pub fn init_tracing(base_dir: &Path) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = base_dir.join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let log_file = std::fs::File::create(log_dir.join(LOG_FILE))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

/// Resolve the configured snapshot directory against `base_dir` unless it is
/// already absolute.
pub fn snapshot_dir(config: &Config, base_dir: &Path) -> PathBuf {
    let dir = Path::new(&config.sources.snapshot_dir);
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        base_dir.join(dir)
    }
}

/// Open the database, run one refresh from the snapshot directory and log
/// the outcome.
pub async fn run_refresh(config: &Config, base_dir: &Path) -> anyhow::Result<RunSummary> {
    let db = Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    if let Some(previous) = db.last_run()? {
        info!(
            "Previous run: {} players for {} at {}",
            previous.player_count,
            previous.season,
            local_time(previous.finished_at)
        );
    }

    let dir = snapshot_dir(config, base_dir);
    info!("Reading stat snapshots from {}", dir.display());
    let source = RetryingSource::new(CsvSnapshotSource::new(dir), config.retry.clone());

    let summary = refresh_grades(&source, &db, config).await?;
    for (archetype, count) in &summary.archetypes {
        info!("  {archetype}: {count}");
    }
    Ok(summary)
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}
