//! Inference agent abstraction layer.
//!
//! The `InferenceAgent` trait hides the HTTP protocol of an inference
//! endpoint behind a reachability probe and a single generation call. The
//! `SecondaryLauncher` trait starts the fallback serving process.

use async_trait::async_trait;
use std::time::Duration;

pub mod error;
pub mod launcher;
pub mod ollama;
pub mod types;

pub use error::AgentError;
pub use launcher::{DisabledLauncher, LaunchedServer, ProcessLauncher, SecondaryLauncher};
pub use ollama::OllamaAgent;
pub use types::{strip_provider, GenerateRequest, HealthStatus, SamplingOptions};

/// Unified interface for inference endpoints.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn InferenceAgent>`.
///
/// # Cancellation Safety
///
/// Dropping a returned future aborts the in-flight HTTP request.
#[async_trait]
pub trait InferenceAgent: Send + Sync + 'static {
    /// Unique identifier for this agent instance.
    fn id(&self) -> &str;

    /// Human-readable name for logging (e.g., "Ollama on localhost").
    fn name(&self) -> &str;

    /// Endpoint base URL.
    fn base_url(&self) -> &str;

    /// Probe the endpoint within `timeout`.
    ///
    /// # Returns
    ///
    /// - `Ok(HealthStatus::Healthy)` if the endpoint answered
    /// - `Ok(HealthStatus::Unhealthy)` if it returned an error status
    /// - `Err(AgentError::Network)` if unreachable
    /// - `Err(AgentError::Timeout)` if the probe timed out
    async fn health_check(&self, timeout: Duration) -> Result<HealthStatus, AgentError>;

    /// Run one non-streaming generation and return the raw response body.
    ///
    /// # Returns
    ///
    /// - `Ok(String)` with the body, unparsed
    /// - `Err(AgentError::Upstream)` if the endpoint returned 4xx/5xx
    /// - `Err(AgentError::Network)` if the connection failed or dropped
    async fn generate(&self, request: GenerateRequest) -> Result<String, AgentError>;
}
