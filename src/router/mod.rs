//! Request routing
//!
//! Turns a significant [`Delta`] (or a direct request) into a
//! [`PendingRequest`]: picks the task shape, asks the scorer for a backend,
//! marks the request in flight and renders the prompt.

pub mod error;
pub mod request;

pub use error::RouteError;
pub use request::{PendingRequest, SettleLatch};

use crate::logging::preview;
use crate::scoring::Priority;
use crate::significance::Delta;
use crate::state::SharedState;
use crate::task::{PromptSubject, TaskType};
use chrono::{DateTime, Utc};

/// Per-call routing inputs
#[derive(Debug, Clone, Copy)]
pub struct RouteContext {
    pub priority: Priority,
    pub now: DateTime<Utc>,
}

impl RouteContext {
    pub fn new(priority: Priority) -> Self {
        Self {
            priority,
            now: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestRouter {
    state: SharedState,
    preview_chars: Option<usize>,
}

impl RequestRouter {
    pub fn new(state: SharedState) -> Self {
        Self {
            state,
            preview_chars: None,
        }
    }

    /// Log a truncated prompt preview with every routed request.
    pub fn with_content_logging(mut self, preview_chars: usize) -> Self {
        self.preview_chars = Some(preview_chars);
        self
    }

    /// Route a classified change.
    ///
    /// First sightings get a whole-file analysis; later changes get an
    /// incremental analysis of the rendered diff.
    pub fn route(&self, delta: &Delta, ctx: RouteContext) -> Result<PendingRequest, RouteError> {
        if !delta.is_significant {
            return Err(RouteError::NotSignificant {
                path: delta.path.clone(),
            });
        }

        let (task, body) = if delta.first_sight || delta.lines.is_empty() {
            (TaskType::RealtimeAnalysis, delta.content.clone())
        } else {
            (TaskType::IncrementalAnalysis, delta.render())
        };

        let prompt = task.build_prompt(&PromptSubject {
            path: Some(&delta.path),
            language: &delta.file_type,
            body: &body,
        });
        self.dispatch(task, &delta.file_type, prompt, Some(delta.path.clone()), ctx)
    }

    /// Route a request that has no delta behind it.
    pub fn route_task(
        &self,
        task: TaskType,
        code: &str,
        language: &str,
        ctx: RouteContext,
    ) -> Result<PendingRequest, RouteError> {
        if code.trim().is_empty() {
            return Err(RouteError::EmptyContent);
        }
        let prompt = task.build_prompt(&PromptSubject {
            path: None,
            language,
            body: code,
        });
        self.dispatch(task, language, prompt, None, ctx)
    }

    fn dispatch(
        &self,
        task: TaskType,
        language: &str,
        prompt: String,
        path: Option<String>,
        ctx: RouteContext,
    ) -> Result<PendingRequest, RouteError> {
        let backend = {
            let mut state = self.state.lock();
            let ranked = state
                .scorer
                .best_backend(task, language, ctx.priority, ctx.now)
                .ok_or(RouteError::NoBackends)?;
            state.scorer.begin_request(&ranked.backend);
            ranked.backend
        };

        let request = PendingRequest::new(task, language, ctx.priority, backend, prompt, path);

        tracing::info!(
            request_id = %request.id,
            task_type = %request.task,
            backend = %request.backend,
            language = %request.language,
            priority = %request.priority,
            path = request.path.as_deref().unwrap_or(""),
            "Routed analysis request"
        );
        if let Some(limit) = self.preview_chars {
            tracing::debug!(
                request_id = %request.id,
                prompt_preview = %preview(&request.prompt, limit),
                "Prompt preview"
            );
        }

        Ok(request)
    }
}
