//! Request and status types shared by agents.

use crate::config::PrimaryConfig;

/// Reachability of an inference endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Endpoint answered the probe.
    Healthy { model_count: usize },
    /// Endpoint answered with an error status.
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy { .. })
    }
}

/// Sampling options sent with every generation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingOptions {
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.9,
        }
    }
}

impl From<&PrimaryConfig> for SamplingOptions {
    fn from(config: &PrimaryConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_p: config.top_p,
        }
    }
}

/// One non-streaming generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    /// Backend identity; a leading `ollama/` prefix is allowed
    pub model: String,
    pub prompt: String,
    pub options: SamplingOptions,
}

/// Model name as the serving process knows it.
///
/// ```
/// use lens::agent::strip_provider;
///
/// assert_eq!(strip_provider("ollama/codellama:7b"), "codellama:7b");
/// assert_eq!(strip_provider("codellama:7b"), "codellama:7b");
/// ```
pub fn strip_provider(model: &str) -> &str {
    model.strip_prefix("ollama/").unwrap_or(model)
}
