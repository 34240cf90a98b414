//! Request pipeline configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits applied to every submitted request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Hard deadline covering probe, fallback and response
    pub global_timeout_seconds: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            global_timeout_seconds: 300,
        }
    }
}

impl PipelineConfig {
    pub fn global_timeout(&self) -> Duration {
        Duration::from_secs(self.global_timeout_seconds)
    }
}
