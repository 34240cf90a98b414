//! Ollama agent implementation.

use super::{strip_provider, AgentError, GenerateRequest, HealthStatus, InferenceAgent};
use crate::config::PrimaryConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Ollama agent implementation.
///
/// Handles Ollama-specific API calls:
/// - Reachability probe via GET /api/tags
/// - Generation via POST /api/generate (non-streaming)
pub struct OllamaAgent {
    /// Unique agent ID
    id: String,
    /// Human-readable name
    name: String,
    /// Base URL (e.g., "http://localhost:11434")
    base_url: String,
    /// Shared HTTP client for connection pooling
    client: Arc<Client>,
}

impl OllamaAgent {
    pub fn new(id: String, name: String, base_url: String, client: Arc<Client>) -> Self {
        Self {
            id,
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Agent for the configured primary endpoint.
    pub fn from_config(config: &PrimaryConfig, client: Arc<Client>) -> Self {
        Self::new(
            "primary".to_string(),
            format!("Ollama on {}", config.url),
            config.url.clone(),
            client,
        )
    }
}

/// Ollama /api/tags response format
#[derive(Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<serde_json::Value>,
}

/// Ollama /api/generate request body
#[derive(Serialize)]
struct OllamaGenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_p: f32,
}

#[async_trait]
impl InferenceAgent for OllamaAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn health_check(&self, timeout: Duration) -> Result<HealthStatus, AgentError> {
        let url = format!("{}/api/tags", self.base_url);
        let timeout_ms = timeout.as_millis() as u64;

        let response = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| AgentError::from_reqwest(e, timeout_ms))?;

        if !response.status().is_success() {
            return Ok(HealthStatus::Unhealthy);
        }

        // Any 2xx answer means reachable; the model list is informational.
        let model_count = match response.text().await {
            Ok(body) => match serde_json::from_str::<OllamaTagsResponse>(&body) {
                Ok(tags) => tags.models.len(),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Unparseable model list from /api/tags");
                    0
                }
            },
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to read /api/tags response body");
                0
            }
        };

        Ok(HealthStatus::Healthy { model_count })
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, AgentError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateBody {
            model: strip_provider(&request.model),
            prompt: &request.prompt,
            stream: false,
            options: OllamaOptions {
                temperature: request.options.temperature,
                top_p: request.options.top_p,
            },
        };

        // No per-call deadline: the pipeline's global timeout bounds the call
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::from_reqwest(e, 0))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AgentError::Upstream {
                status: status.as_u16(),
                message: error_body,
            });
        }

        response
            .text()
            .await
            .map_err(|e| AgentError::Network(format!("Failed to read response body: {}", e)))
    }
}
