//! CLI module for Lens
//!
//! Command-line interface definitions and handlers for the analysis router.
//!
//! # Commands
//!
//! - `analyze` - Analyze one file through the router and fallback pipeline
//! - `stats` - Show persisted backend statistics
//! - `probe` - Check that the primary endpoint answers
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Review a file for performance problems
//! lens analyze src/main.cpp --task performance
//!
//! # Show what the scorer has learned so far
//! lens stats --json
//!
//! # Generate shell completions
//! lens completions bash > ~/.bash_completion.d/lens
//! ```

pub mod analyze;
pub mod completions;
pub mod config;
pub mod output;
pub mod probe;
pub mod stats;

pub use completions::handle_completions;
pub use config::{handle_config_init, load_config};

use crate::scoring::Priority;
use crate::task::TaskType;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Lens - Adaptive code analysis router
#[derive(Parser, Debug)]
#[command(
    name = "lens",
    version,
    about = "Adaptive analysis-request router for local inference backends"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a file
    Analyze(AnalyzeArgs),
    /// Show backend statistics
    Stats(StatsArgs),
    /// Probe the primary endpoint
    Probe(ProbeArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// File to analyze
    pub file: PathBuf,

    /// Analysis kind (realtime, incremental, performance, tests, contextual)
    #[arg(short, long, default_value = "realtime")]
    pub task: TaskType,

    /// Backend selection priority (speed, accuracy, balanced)
    #[arg(short, long)]
    pub priority: Option<Priority>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = "lens.toml")]
    pub config: PathBuf,

    /// Override the primary endpoint URL
    #[arg(long, env = "LENS_PRIMARY_URL")]
    pub primary_url: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Never start the secondary serving process
    #[arg(long)]
    pub no_secondary: bool,

    /// Do not read or write backend statistics
    #[arg(long)]
    pub no_persist: bool,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = "lens.toml")]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = "lens.toml")]
    pub config: PathBuf,

    /// Override the primary endpoint URL
    #[arg(long, env = "LENS_PRIMARY_URL")]
    pub primary_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "lens.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
