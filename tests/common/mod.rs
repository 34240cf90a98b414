//! Shared test utilities for Lens integration tests.
//!
//! Provides wiremock-backed Ollama endpoints and configuration builders.

#![allow(dead_code)]

use lens::config::LensConfig;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Well-Known Test Content
// =============================================================================

/// First version of the `a.py` scenario file.
pub const A_PY_V1: &str = "import os\n\ndef main():\n    print(os.getcwd())\n";

/// `a.py` with a new function added.
pub const A_PY_V2: &str =
    "import os\n\ndef main():\n    print(os.getcwd())\n\ndef helper():\n    return 42\n";

// =============================================================================
// Mock Endpoints
// =============================================================================

/// Mount a healthy `/api/tags` probe answering after `delay`.
pub async fn mount_tags(server: &MockServer, delay: Duration) {
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"models": [{"name": "codellama:7b"}]}))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Mount `/api/generate` answering with an Ollama envelope around `answer`.
pub async fn mount_generate(server: &MockServer, answer: &str) {
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "codellama:7b",
            "response": answer,
            "done": true
        })))
        .mount(server)
        .await;
}

/// Number of `/api/generate` calls the server has seen.
pub async fn generate_calls(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/api/generate")
        .count()
}

// =============================================================================
// Configuration Builders
// =============================================================================

/// Configuration pointed at `url` with short debounce intervals, no
/// secondary process and statistics under `data_dir`.
pub fn test_config(url: &str, data_dir: &Path) -> LensConfig {
    let mut config = LensConfig::default();
    config.primary.url = url.to_string();
    config.primary.probe_timeout_seconds = 1;
    config.pipeline.global_timeout_seconds = 10;
    config.analysis.incremental_debounce_ms = 50;
    config.analysis.full_debounce_ms = 100;
    config.secondary.enabled = false;
    config.secondary.grace_seconds = 0;
    config.persistence.path = Some(data_dir.join("performance.json"));
    config.persistence.interval_seconds = 3600;
    config
}

/// TOML rendering of [`test_config`] for the CLI.
pub fn test_config_toml(url: &str, data_dir: &Path) -> String {
    toml::to_string(&test_config(url, data_dir)).expect("config serializes")
}
