//! In-flight request unit

use crate::scoring::Priority;
use crate::task::TaskType;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// One-shot terminal latch shared by everything racing to finish a request.
///
/// The first [`settle`](SettleLatch::settle) wins and cancels the token.
#[derive(Debug, Clone, Default)]
pub struct SettleLatch {
    settled: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl SettleLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true for exactly one caller.
    pub fn settle(&self) -> bool {
        let first = !self.settled.swap(true, Ordering::AcqRel);
        if first {
            self.cancel.cancel();
        }
        first
    }

    pub fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// A routed request awaiting its terminal outcome.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub id: Uuid,
    pub task: TaskType,
    pub language: String,
    pub priority: Priority,
    /// Backend chosen by the scorer
    pub backend: String,
    pub prompt: String,
    pub path: Option<String>,
    pub submitted_at: DateTime<Utc>,
    latch: SettleLatch,
}

impl PendingRequest {
    pub fn new(
        task: TaskType,
        language: impl Into<String>,
        priority: Priority,
        backend: impl Into<String>,
        prompt: impl Into<String>,
        path: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task,
            language: language.into(),
            priority,
            backend: backend.into(),
            prompt: prompt.into(),
            path,
            submitted_at: Utc::now(),
            latch: SettleLatch::new(),
        }
    }

    pub fn latch(&self) -> &SettleLatch {
        &self.latch
    }

    /// Claim the terminal outcome; only the first call returns true.
    pub fn settle(&self) -> bool {
        self.latch.settle()
    }

    pub fn is_settled(&self) -> bool {
        self.latch.is_settled()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.latch.token().clone()
    }
}
