//! Lens - Adaptive analysis-request router
//!
//! Turns a stream of editor change events into a minimal set of analysis
//! requests, picks the best local inference backend for each one from
//! rolling performance statistics, and drives every request through a
//! probe / fallback / timeout pipeline that settles exactly once.

pub mod agent;
pub mod cli;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod logging;
pub mod pipeline;
pub mod router;
pub mod scoring;
pub mod significance;
pub mod state;
pub mod store;
pub mod task;
pub mod telemetry;
pub mod tracker;
