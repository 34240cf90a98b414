//! Pipeline states and the per-request trace

use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Where a request is in the fallback state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    ProbingPrimary,
    Connected,
    StartingSecondary,
    AwaitingResponse,
    Completed,
    Failed,
    TimedOut,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::Completed | PipelineState::Failed | PipelineState::TimedOut
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::ProbingPrimary => "probing_primary",
            PipelineState::Connected => "connected",
            PipelineState::StartingSecondary => "starting_secondary",
            PipelineState::AwaitingResponse => "awaiting_response",
            PipelineState::Completed => "completed",
            PipelineState::Failed => "failed",
            PipelineState::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct TraceInner {
    states: Vec<PipelineState>,
    backend: String,
}

/// States visited by one request and the backend currently serving it.
///
/// Shared with the running attempt so the timeout path can still read it
/// after the attempt future is dropped.
#[derive(Debug, Clone)]
pub struct RunTrace {
    inner: Arc<Mutex<TraceInner>>,
}

impl RunTrace {
    pub fn new(backend: &str) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TraceInner {
                states: vec![PipelineState::Idle],
                backend: backend.to_string(),
            })),
        }
    }

    pub fn enter(&self, state: PipelineState) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::trace!(from = %inner.states.last().copied().unwrap_or(PipelineState::Idle), to = %state, "Pipeline transition");
        inner.states.push(state);
    }

    pub fn set_backend(&self, backend: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.backend = backend.to_string();
    }

    pub fn backend(&self) -> String {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .backend
            .clone()
    }

    pub fn states(&self) -> Vec<PipelineState> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .states
            .clone()
    }

    pub fn current(&self) -> PipelineState {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .states
            .last()
            .copied()
            .unwrap_or(PipelineState::Idle)
    }
}
