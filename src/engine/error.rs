//! Engine error types

use crate::config::ConfigError;
use crate::router::RouteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("Request was cancelled before it finished")]
    Cancelled,
}
