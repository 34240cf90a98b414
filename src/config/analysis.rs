//! Change analysis configuration

use crate::scoring::Priority;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for change tracking, significance detection and debouncing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Analyze edits automatically as they arrive
    pub realtime_enabled: bool,
    /// Quiet period before an incremental analysis fires
    pub incremental_debounce_ms: u64,
    /// Quiet period before a full-file analysis fires
    pub full_debounce_ms: u64,
    /// Priority mode used for real-time requests
    pub priority: Priority,
    /// Content shorter than this is ignored
    pub min_content_len: usize,
    /// Upper bound on tracked files before LRU eviction
    pub max_tracked_files: usize,
    /// Diff lines above this count make a change significant
    pub significant_line_threshold: usize,
    /// Characters of content kept as the diff base
    pub snapshot_limit_chars: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            realtime_enabled: true,
            incremental_debounce_ms: 800,
            full_debounce_ms: 1500,
            priority: Priority::Speed,
            min_content_len: 10,
            max_tracked_files: 256,
            significant_line_threshold: 3,
            snapshot_limit_chars: 10_000,
        }
    }
}

impl AnalysisConfig {
    pub fn incremental_debounce(&self) -> Duration {
        Duration::from_millis(self.incremental_debounce_ms)
    }

    pub fn full_debounce(&self) -> Duration {
        Duration::from_millis(self.full_debounce_ms)
    }
}
