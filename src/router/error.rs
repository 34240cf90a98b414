//! Error types for routing failures

use thiserror::Error;

/// Reasons a change or direct request produced no outbound request
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The delta did not clear the significance bar
    #[error("Change to '{path}' is not significant")]
    NotSignificant { path: String },

    /// The catalog is empty
    #[error("No backends configured")]
    NoBackends,

    /// A direct request carried no code
    #[error("Nothing to analyze")]
    EmptyContent,
}
