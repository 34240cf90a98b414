//! Analyze command implementation

use crate::cli::output::{format_outcome_json, format_outcome_pretty};
use crate::cli::{load_config, AnalyzeArgs};
use crate::config::LensConfig;
use crate::engine::{AnalysisEngine, LogSink};
use crate::logging::init_tracing;
use crate::significance::file_type_of;
use std::sync::Arc;

/// Load configuration with CLI overrides
pub fn load_config_with_overrides(
    args: &AnalyzeArgs,
) -> Result<LensConfig, Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config)?;

    // CLI overrides win over file and environment
    if let Some(ref url) = args.primary_url {
        config.primary.url = url.clone();
    }
    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }
    if args.no_secondary {
        config.secondary.enabled = false;
    }
    if args.no_persist {
        config.persistence.enabled = false;
    }

    Ok(config)
}

/// Main analyze command handler
pub async fn run_analyze(args: AnalyzeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_with_overrides(&args)?;
    config.validate()?;
    init_tracing(&config.logging)?;

    let content = std::fs::read_to_string(&args.file)
        .map_err(|e| format!("Cannot read {}: {}", args.file.display(), e))?;
    let language = file_type_of(&args.file.to_string_lossy());
    let priority = args.priority.unwrap_or(config.analysis.priority);

    tracing::debug!(?config, "Loaded configuration");

    let engine = AnalysisEngine::start(&config, Arc::new(LogSink))?;
    let outcome = engine.analyze(args.task, &content, &language, priority).await;
    engine.shutdown().await;
    let outcome = outcome?;

    if args.json {
        println!("{}", format_outcome_json(&outcome)?);
    } else {
        println!("{}", format_outcome_pretty(&outcome));
    }

    match &outcome.result {
        Ok(_) => Ok(()),
        Err(e) => Err(e.user_message().into()),
    }
}
