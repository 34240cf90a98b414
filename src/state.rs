//! Shared router state
//!
//! File tracking and backend statistics sit behind one coarse mutex. Every
//! read-modify-write sequence takes the lock once and releases it before any
//! `.await`.

use crate::config::LensConfig;
use crate::scoring::BackendScorer;
use crate::significance::SignificanceClassifier;
use crate::tracker::ChangeTracker;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
pub struct RouterState {
    pub tracker: ChangeTracker,
    pub classifier: SignificanceClassifier,
    pub scorer: BackendScorer,
}

impl RouterState {
    pub fn new(tracker: ChangeTracker, classifier: SignificanceClassifier, scorer: BackendScorer) -> Self {
        Self {
            tracker,
            classifier,
            scorer,
        }
    }

    pub fn from_config(config: &LensConfig) -> Self {
        Self::new(
            ChangeTracker::new(config.analysis.max_tracked_files),
            SignificanceClassifier::new(
                config.analysis.significant_line_threshold,
                config.analysis.snapshot_limit_chars,
            ),
            BackendScorer::new(config.catalog(), config.scoring.clone()),
        )
    }

    pub fn into_shared(self) -> SharedState {
        SharedState::new(self)
    }
}

/// Cloneable handle to the router state.
#[derive(Debug, Clone)]
pub struct SharedState {
    inner: Arc<Mutex<RouterState>>,
}

impl SharedState {
    pub fn new(state: RouterState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Lock the state, ignoring poisoning.
    pub fn lock(&self) -> MutexGuard<'_, RouterState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
