//! Configuration module for Lens
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`LENS_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use lens::config::LensConfig;
//!
//! let config = LensConfig::default();
//! assert_eq!(config.analysis.full_debounce_ms, 1500);
//!
//! let toml = r#"
//! [pipeline]
//! global_timeout_seconds = 60
//! "#;
//! let config: LensConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.pipeline.global_timeout_seconds, 60);
//! ```

pub mod analysis;
pub mod backend;
pub mod error;
pub mod logging;
pub mod persistence;
pub mod pipeline;

pub use analysis::AnalysisConfig;
pub use backend::{default_catalog, BackendConfig, PrimaryConfig, SecondaryConfig};
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use persistence::PersistenceConfig;
pub use pipeline::PipelineConfig;

// Scoring weights live with the scorer
pub use crate::scoring::ScoringWeights;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Unified configuration for the analysis router.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LensConfig {
    /// Change tracking and debounce settings
    pub analysis: AnalysisConfig,
    /// Primary inference endpoint
    pub primary: PrimaryConfig,
    /// Fallback serving process
    pub secondary: SecondaryConfig,
    /// Global request limits
    pub pipeline: PipelineConfig,
    /// Statistics persistence
    pub persistence: PersistenceConfig,
    /// Scorer weights and penalties
    pub scoring: ScoringWeights,
    /// Backend catalog (empty means the built-in catalog)
    pub backends: Vec<BackendConfig>,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl LensConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("LENS_PRIMARY_URL") {
            if !url.is_empty() {
                self.primary.url = url;
            }
        }

        if let Ok(level) = std::env::var("LENS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LENS_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        if let Ok(realtime) = std::env::var("LENS_REALTIME") {
            self.analysis.realtime_enabled = realtime.to_lowercase() == "true";
        }
        if let Ok(priority) = std::env::var("LENS_PRIORITY") {
            if let Ok(p) = priority.parse() {
                self.analysis.priority = p;
            }
        }

        self
    }

    /// Backend catalog in tie-break order.
    pub fn catalog(&self) -> Vec<BackendConfig> {
        if self.backends.is_empty() {
            default_catalog()
        } else {
            self.backends.clone()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.primary.url.starts_with("http://") && !self.primary.url.starts_with("https://") {
            return Err(ConfigError::invalid(
                "primary.url",
                "URL must start with http:// or https://",
            ));
        }
        if self.primary.probe_timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "primary.probe_timeout_seconds",
                "probe timeout must be non-zero",
            ));
        }
        if self.pipeline.global_timeout_seconds <= self.primary.probe_timeout_seconds {
            return Err(ConfigError::invalid(
                "pipeline.global_timeout_seconds",
                "global timeout must exceed the probe timeout",
            ));
        }
        if self.analysis.incremental_debounce_ms == 0 || self.analysis.full_debounce_ms == 0 {
            return Err(ConfigError::invalid(
                "analysis.debounce",
                "debounce intervals must be non-zero",
            ));
        }
        if self.analysis.max_tracked_files == 0 {
            return Err(ConfigError::invalid(
                "analysis.max_tracked_files",
                "at least one file must be trackable",
            ));
        }
        if self.persistence.enabled && self.persistence.interval_seconds == 0 {
            return Err(ConfigError::invalid(
                "persistence.interval_seconds",
                "write interval must be non-zero",
            ));
        }
        if self.secondary.enabled && self.secondary.command.trim().is_empty() {
            return Err(ConfigError::invalid(
                "secondary.command",
                "command cannot be empty while the secondary path is enabled",
            ));
        }

        let mut seen = HashSet::new();
        for (i, backend) in self.backends.iter().enumerate() {
            if backend.name.is_empty() {
                return Err(ConfigError::invalid(
                    format!("backends[{}].name", i),
                    "name cannot be empty",
                ));
            }
            if !seen.insert(backend.name.as_str()) {
                return Err(ConfigError::invalid(
                    format!("backends[{}].name", i),
                    format!("duplicate backend '{}'", backend.name),
                ));
            }
            if !(0.0..=1.0).contains(&backend.speed) || !(0.0..=1.0).contains(&backend.accuracy) {
                return Err(ConfigError::invalid(
                    format!("backends[{}]", i),
                    "speed and accuracy must be within 0.0..=1.0",
                ));
            }
            if backend.max_concurrency == 0 {
                return Err(ConfigError::invalid(
                    format!("backends[{}].max_concurrency", i),
                    "max_concurrency must be non-zero",
                ));
            }
        }

        self.scoring
            .validate()
            .map_err(|message| ConfigError::invalid("scoring", message))?;

        Ok(())
    }
}
