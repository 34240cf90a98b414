//! Error types for analysis requests

use thiserror::Error;

/// Terminal failure of one analysis request
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// Neither the primary endpoint nor the secondary path answered
    #[error("Inference endpoint at {url} is unreachable: {detail}")]
    UnreachablePrimary { url: String, detail: String },

    /// The connection failed mid-request, including after the fallback retry
    #[error("Transport error: {0}")]
    Transport(String),

    /// The endpoint answered with an error status
    #[error("Backend error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// The endpoint answered with nothing usable
    #[error("Backend returned an empty response")]
    EmptyResponse,

    /// The global deadline ran out
    #[error("Analysis timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

impl AnalysisError {
    /// Short label used for metrics and sink callbacks.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::UnreachablePrimary { .. } => "unreachable",
            AnalysisError::Transport(_) => "transport",
            AnalysisError::Upstream { .. } => "upstream",
            AnalysisError::EmptyResponse => "empty_response",
            AnalysisError::Timeout { .. } => "timeout",
        }
    }

    /// Message shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::Upstream { status, .. } if *status >= 500 => {
                format!("Server error ({}): the inference service failed", status)
            }
            other => other.to_string(),
        }
    }
}
