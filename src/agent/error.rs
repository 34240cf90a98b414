//! Error types for agent operations.

use thiserror::Error;

/// Errors that can occur during agent operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// Network connectivity error (DNS, connection refused, reset mid-body).
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded deadline.
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Backend returned an error response (4xx, 5xx).
    #[error("Backend error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// The secondary serving process could not be started.
    #[error("Launch failed: {0}")]
    Launch(String),

    /// Agent configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AgentError {
    /// Map a reqwest failure, attributing timeouts to the given deadline.
    pub fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            AgentError::Timeout(timeout_ms)
        } else {
            AgentError::Network(err.to_string())
        }
    }
}
