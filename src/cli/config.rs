//! Config command handlers

use crate::cli::ConfigInitArgs;
use crate::config::LensConfig;
use std::fs;
use std::path::Path;

const EXAMPLE_CONFIG: &str = include_str!("../../lens.example.toml");

/// Load configuration from `path` when it exists, then apply environment overrides.
pub fn load_config(path: &Path) -> Result<LensConfig, Box<dyn std::error::Error>> {
    let config = if path.exists() {
        LensConfig::load(Some(path))?
    } else {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        LensConfig::default()
    };
    Ok(config.with_env_overrides())
}

/// Handle `lens config init` command
pub fn handle_config_init(args: &ConfigInitArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.output.exists() && !args.force {
        return Err(format!(
            "File already exists: {}. Use --force to overwrite.",
            args.output.display()
        )
        .into());
    }

    fs::write(&args.output, EXAMPLE_CONFIG)?;

    println!("✓ Configuration file created: {}", args.output.display());
    println!("  Edit this file to tune debouncing, backends and fallback behavior.");

    Ok(())
}
