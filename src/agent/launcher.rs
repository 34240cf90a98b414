//! Secondary serving process management.

use super::AgentError;
use crate::config::SecondaryConfig;
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Mutex;
use tokio::process::{Child, Command};

/// A serving process started for one request.
///
/// Dropping it before [`SecondaryLauncher::adopt`] kills the process.
#[derive(Debug)]
pub struct LaunchedServer {
    /// Model the secondary path serves, which may differ from the one routed to
    pub served_model: String,
    child: Option<Child>,
    reused: bool,
}

impl LaunchedServer {
    /// A freshly started server; `child` is None when the process is not owned here.
    pub fn started(served_model: impl Into<String>, child: Option<Child>) -> Self {
        Self {
            served_model: served_model.into(),
            child,
            reused: false,
        }
    }

    /// A server that was already running, needing no grace period.
    pub fn reused(served_model: impl Into<String>) -> Self {
        Self {
            served_model: served_model.into(),
            child: None,
            reused: true,
        }
    }

    pub fn is_reused(&self) -> bool {
        self.reused
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }
}

/// Starts the fallback serving path when the primary endpoint is unreachable.
#[async_trait]
pub trait SecondaryLauncher: Send + Sync + 'static {
    /// Start (or reuse) a serving process for `model`.
    async fn launch(&self, model: &str) -> Result<LaunchedServer, AgentError>;

    /// Keep a process alive past the request that started it.
    fn adopt(&self, server: LaunchedServer);
}

/// Spawns the configured serving command (default `ollama serve`).
pub struct ProcessLauncher {
    command: String,
    args: Vec<String>,
    model_override: Option<String>,
    adopted: Mutex<Option<Child>>,
}

impl ProcessLauncher {
    pub fn new(command: impl Into<String>, args: Vec<String>, model_override: Option<String>) -> Self {
        Self {
            command: command.into(),
            args,
            model_override,
            adopted: Mutex::new(None),
        }
    }

    pub fn from_config(config: &SecondaryConfig) -> Self {
        Self::new(
            config.command.clone(),
            config.args.clone(),
            config.model.clone(),
        )
    }

    fn served_model(&self, requested: &str) -> String {
        self.model_override
            .clone()
            .unwrap_or_else(|| requested.to_string())
    }

    /// Whether an adopted process is still running.
    pub fn has_running_server(&self) -> bool {
        let mut adopted = self
            .adopted
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match adopted.as_mut().map(|c| c.try_wait()) {
            Some(Ok(None)) => true,
            Some(_) => {
                *adopted = None;
                false
            }
            None => false,
        }
    }
}

#[async_trait]
impl SecondaryLauncher for ProcessLauncher {
    async fn launch(&self, model: &str) -> Result<LaunchedServer, AgentError> {
        let served_model = self.served_model(model);
        if self.has_running_server() {
            tracing::debug!(model = %served_model, "Reusing running secondary server");
            return Ok(LaunchedServer::reused(served_model));
        }

        let child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AgentError::Launch(format!("{}: {}", self.command, e)))?;

        tracing::info!(
            command = %self.command,
            pid = child.id().unwrap_or_default(),
            model = %served_model,
            "Started secondary server"
        );
        Ok(LaunchedServer::started(served_model, Some(child)))
    }

    fn adopt(&self, mut server: LaunchedServer) {
        let Some(child) = server.child.take() else {
            return;
        };
        let mut adopted = self
            .adopted
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // A live adopted server keeps serving; the newcomer is dropped and killed.
        if let Some(existing) = adopted.as_mut() {
            if matches!(existing.try_wait(), Ok(None)) {
                tracing::debug!(
                    kept = existing.id().unwrap_or_default(),
                    dropped = child.id().unwrap_or_default(),
                    "Secondary server already adopted"
                );
                return;
            }
        }
        *adopted = Some(child);
    }
}

/// Launcher used when the secondary path is switched off.
pub struct DisabledLauncher;

#[async_trait]
impl SecondaryLauncher for DisabledLauncher {
    async fn launch(&self, _model: &str) -> Result<LaunchedServer, AgentError> {
        Err(AgentError::Configuration(
            "secondary serving path is disabled".to_string(),
        ))
    }

    fn adopt(&self, _server: LaunchedServer) {}
}
