// Table sources: where raw per-category tables come from.
//
// `CsvSnapshotSource` reads one CSV file per category from a directory.
// `RetryingSource` wraps any source with bounded exponential backoff.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use courtside_core::config::RetryConfig;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::table::{RawTable, StatCategory};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no {category} table at {}", path.display())]
    NotFound { category: StatCategory, path: PathBuf },

    #[error("failed to read {category} table: {source}")]
    Io {
        category: StatCategory,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {category} table: {source}")]
    Malformed {
        category: StatCategory,
        #[source]
        source: csv::Error,
    },

    #[error("{category} fetch failed after {attempts} attempts: {last}")]
    Exhausted {
        category: StatCategory,
        attempts: u32,
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Whether another attempt could succeed. A missing table will stay
    /// missing.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::NotFound { .. })
    }
}

/// Anything that can produce the raw table for a stat category.
#[async_trait]
pub trait TableSource: Send + Sync {
    async fn fetch_table(&self, category: StatCategory) -> Result<RawTable, FetchError>;
}

// ---------------------------------------------------------------------------
// CSV snapshots
// ---------------------------------------------------------------------------

/// Reads `<dir>/<stem>.csv` for each category.
#[derive(Debug, Clone)]
pub struct CsvSnapshotSource {
    dir: PathBuf,
}

impl CsvSnapshotSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CsvSnapshotSource { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, category: StatCategory) -> PathBuf {
        self.dir.join(format!("{}.csv", category.stem()))
    }
}

#[async_trait]
impl TableSource for CsvSnapshotSource {
    async fn fetch_table(&self, category: StatCategory) -> Result<RawTable, FetchError> {
        let path = self.path_for(category);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::NotFound { category, path });
            }
            Err(source) => return Err(FetchError::Io { category, source }),
        };
        let table = RawTable::from_csv_reader(bytes.as_slice())
            .map_err(|source| FetchError::Malformed { category, source })?;
        debug!(
            "read {} rows x {} columns from {}",
            table.records.len(),
            table.headers.len(),
            path.display()
        );
        Ok(table)
    }
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

/// Wraps a source and retries failed fetches with exponential backoff.
pub struct RetryingSource<S> {
    inner: S,
    policy: RetryConfig,
}

impl<S: TableSource> RetryingSource<S> {
    pub fn new(inner: S, policy: RetryConfig) -> Self {
        RetryingSource { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: TableSource> TableSource for RetryingSource<S> {
    async fn fetch_table(&self, category: StatCategory) -> Result<RawTable, FetchError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut delay = Duration::from_millis(self.policy.initial_delay_ms);
        let max_delay = Duration::from_millis(self.policy.max_delay_ms);

        let mut attempt = 1;
        loop {
            let err = match self.inner.fetch_table(category).await {
                Ok(table) => return Ok(table),
                Err(e) => e,
            };
            if !err.is_retryable() {
                return Err(err);
            }
            if attempt >= max_attempts {
                return Err(FetchError::Exhausted {
                    category,
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            warn!(
                "{category} fetch attempt {attempt}/{max_attempts} failed: {err}, retrying in {:?}",
                delay
            );
            sleep(delay).await;
            delay = delay
                .mul_f64(self.policy.backoff_multiplier)
                .min(max_delay);
            attempt += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
