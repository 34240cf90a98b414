//! Backend configuration
//!
//! A backend is a model served by the local inference endpoint. The catalog
//! order is the tie-break order used by the scorer.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Primary inference endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryConfig {
    /// Base URL of the Ollama-compatible server
    pub url: String,
    /// Timeout for the reachability probe
    pub probe_timeout_seconds: u64,
    /// Sampling temperature sent with every generate call
    pub temperature: f32,
    /// Nucleus sampling value sent with every generate call
    pub top_p: f32,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            probe_timeout_seconds: 5,
            temperature: 0.1,
            top_p: 0.9,
        }
    }
}

impl PrimaryConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }
}

/// Secondary hosting path, started when the primary is unreachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecondaryConfig {
    pub enabled: bool,
    /// Program to spawn
    pub command: String,
    pub args: Vec<String>,
    /// Delay after spawning before the request is retried
    pub grace_seconds: u64,
    /// Model served by the secondary path, if it differs from the routed one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Default for SecondaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "ollama".to_string(),
            args: vec!["serve".to_string()],
            grace_seconds: 3,
            model: None,
        }
    }
}

impl SecondaryConfig {
    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace_seconds)
    }
}

/// One entry of the backend catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Model name, e.g. `ollama/codellama:7b`
    pub name: String,
    /// Raw speed sub-score (0-1)
    #[serde(default = "default_sub_score")]
    pub speed: f64,
    /// Raw accuracy sub-score (0-1)
    #[serde(default = "default_sub_score")]
    pub accuracy: f64,
    /// File type tags this model is strong at
    #[serde(default)]
    pub languages: Vec<String>,
    /// Task types this model is strong at (e.g. "performance_analysis")
    #[serde(default)]
    pub tasks: Vec<String>,
    /// In-flight requests at which the backend counts as fully loaded
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u32,
}

fn default_sub_score() -> f64 {
    0.5
}

fn default_max_concurrency() -> u32 {
    2
}

impl BackendConfig {
    pub fn new(name: &str, speed: f64, accuracy: f64) -> Self {
        Self {
            name: name.to_string(),
            speed,
            accuracy,
            languages: Vec::new(),
            tasks: Vec::new(),
            max_concurrency: default_max_concurrency(),
        }
    }

    pub fn with_languages(mut self, languages: &[&str]) -> Self {
        self.languages = languages.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_tasks(mut self, tasks: &[&str]) -> Self {
        self.tasks = tasks.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// Catalog used when the config file lists no backends.
pub fn default_catalog() -> Vec<BackendConfig> {
    vec![
        BackendConfig::new("ollama/codegemma:7b", 0.9, 0.8)
            .with_languages(&["js", "ts", "javascript"])
            .with_tasks(&["realtime_analysis", "incremental_analysis"]),
        BackendConfig::new("ollama/codellama:7b", 0.85, 0.8)
            .with_languages(&["cpp", "h", "hpp", "py", "python", "js", "ts", "javascript"]),
        BackendConfig::new("ollama/deepseek-coder:6.7b", 0.7, 0.9)
            .with_languages(&["py", "python"])
            .with_tasks(&["performance_analysis"]),
        BackendConfig::new("ollama/magicoder:7b", 0.8, 0.85)
            .with_languages(&["cpp", "h", "hpp"])
            .with_tasks(&["realtime_analysis", "incremental_analysis"]),
        BackendConfig::new("ollama/qwen2.5-coder:7b", 0.6, 0.95)
            .with_tasks(&["performance_analysis"]),
    ]
}
