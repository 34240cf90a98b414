//! Performance statistics persistence
//!
//! Scorer records are written to a small JSON file on an interval and at
//! shutdown, and read once at startup. Persistence is best effort: a missing
//! or unreadable file leaves the scorer starting from its priors.

use crate::scoring::PerformanceRecord;
use crate::state::SharedState;
use crate::telemetry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Current file layout version
pub const STORE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed statistics file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported statistics file version {found} (expected {STORE_VERSION})")]
    Version { found: u32 },

    #[error("Background write failed: {0}")]
    Join(String),
}

/// On-disk layout
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreFile {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub records: Vec<PerformanceRecord>,
}

#[derive(Debug, Clone)]
pub struct PerformanceStore {
    path: PathBuf,
}

impl PerformanceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read records; a missing file yields an empty set.
    pub fn load(&self) -> Result<Vec<PerformanceRecord>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let file: StoreFile =
            serde_json::from_str(&content).map_err(|source| StoreError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        if file.version != STORE_VERSION {
            return Err(StoreError::Version {
                found: file.version,
            });
        }
        Ok(file.records)
    }

    /// Read records, logging and discarding any failure.
    pub fn load_or_empty(&self) -> Vec<PerformanceRecord> {
        match self.load() {
            Ok(records) => {
                tracing::debug!(
                    path = %self.path.display(),
                    records = records.len(),
                    "Loaded performance statistics"
                );
                records
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring performance statistics file");
                Vec::new()
            }
        }
    }

    /// Write records atomically (temp file, then rename).
    pub fn save(&self, records: &[PerformanceRecord]) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let file = StoreFile {
            version: STORE_VERSION,
            saved_at: Utc::now(),
            records: records.to_vec(),
        };
        let content =
            serde_json::to_string_pretty(&file).map_err(|source| StoreError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).map_err(io_err)?;
        std::fs::rename(&temp_path, &self.path).map_err(io_err)?;
        Ok(())
    }

    /// Snapshot the scorer under the lock and write outside it.
    pub async fn flush(&self, state: &SharedState) -> Result<u64, StoreError> {
        let (records, revision) = {
            let guard = state.lock();
            (guard.scorer.snapshot(), guard.scorer.revision())
        };
        let store = self.clone();
        let result = tokio::task::spawn_blocking(move || store.save(&records))
            .await
            .map_err(|e| StoreError::Join(e.to_string()))
            .and_then(|r| r);
        telemetry::record_store_write(result.is_ok());
        result.map(|_| revision)
    }

    /// Start the periodic writer.
    ///
    /// Writes only when the scorer has new outcomes, and once more on
    /// cancellation.
    pub fn start(
        self,
        state: SharedState,
        every: Duration,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut saved_revision = state.lock().scorer.revision();

            tracing::info!(
                path = %self.path.display(),
                interval_seconds = every.as_secs(),
                "Statistics writer started"
            );

            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        if state.lock().scorer.revision() != saved_revision {
                            if let Err(e) = self.flush(&state).await {
                                tracing::warn!(error = %e, "Final statistics write failed");
                            }
                        }
                        tracing::info!("Statistics writer shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        if state.lock().scorer.revision() == saved_revision {
                            continue;
                        }
                        match self.flush(&state).await {
                            Ok(revision) => {
                                saved_revision = revision;
                                tracing::debug!(revision, "Statistics written");
                            }
                            Err(e) => tracing::warn!(error = %e, "Statistics write failed"),
                        }
                    }
                }
            }
        })
    }
}
