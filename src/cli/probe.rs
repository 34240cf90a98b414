//! Probe command implementation

use crate::agent::{HealthStatus, InferenceAgent, OllamaAgent};
use crate::cli::{load_config, ProbeArgs};
use colored::Colorize;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub url: String,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub latency_ms: u64,
}

/// Probe `agent` once within `timeout`.
pub async fn probe(agent: &dyn InferenceAgent, timeout: std::time::Duration) -> ProbeReport {
    let started = Instant::now();
    let result = agent.health_check(timeout).await;
    let latency_ms = started.elapsed().as_millis() as u64;

    let (reachable, model_count, error) = match result {
        Ok(HealthStatus::Healthy { model_count }) => (true, Some(model_count), None),
        Ok(HealthStatus::Unhealthy) => (false, None, Some("endpoint returned an error status".to_string())),
        Err(e) => (false, None, Some(e.to_string())),
    };

    ProbeReport {
        url: agent.base_url().to_string(),
        reachable,
        model_count,
        error,
        latency_ms,
    }
}

/// Format a probe report as pretty text
pub fn format_probe_pretty(report: &ProbeReport) -> String {
    if report.reachable {
        format!(
            "{} {} reachable ({} models, {}ms)",
            "✓".green(),
            report.url,
            report.model_count.unwrap_or_default(),
            report.latency_ms
        )
    } else {
        format!(
            "{} {} unreachable: {}",
            "✗".red(),
            report.url,
            report.error.as_deref().unwrap_or("unknown error")
        )
    }
}

/// Handle `lens probe` command
pub async fn handle_probe(args: &ProbeArgs) -> Result<String, Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config)?;
    if let Some(ref url) = args.primary_url {
        config.primary.url = url.clone();
    }
    config.validate()?;

    let agent = OllamaAgent::from_config(&config.primary, Arc::new(Client::new()));
    let report = probe(&agent, config.primary.probe_timeout()).await;

    let output = if args.json {
        serde_json::to_string_pretty(&report)?
    } else {
        format_probe_pretty(&report)
    };
    if report.reachable {
        Ok(output)
    } else {
        println!("{}", output);
        Err(format!("Primary endpoint {} is unreachable", report.url).into())
    }
}
