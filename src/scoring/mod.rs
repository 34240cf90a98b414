//! Adaptive backend scoring
//!
//! The [`BackendScorer`] owns the backend catalog, the live per-backend
//! profiles, and the per-(backend, task) history. Selection is a pure
//! ranking ([`score::score_backend`]) followed by a usage stamp on the winner,
//! so repeated requests spread across near-equal backends.

pub mod profile;
pub mod score;

pub use profile::{BackendProfile, PerformanceRecord, WINDOW_SIZE};
pub use score::{base_score, score_backend, Candidate, ScoreContext, ScoringWeights};

use crate::config::BackendConfig;
use crate::task::TaskType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Task type used when a pairing has no task-specific history
pub const GENERAL_TASK: &str = "general";

/// Caller's preference between fast and thorough backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Speed,
    Accuracy,
    Balanced,
}

impl Priority {
    /// Combine the historical base with the backend's static sub-scores.
    pub fn blend(&self, base: f64, speed: f64, accuracy: f64) -> f64 {
        match self {
            Priority::Speed => 0.7 * base + 0.3 * speed,
            Priority::Accuracy => 0.7 * base + 0.3 * accuracy,
            Priority::Balanced => 0.6 * base + 0.2 * speed + 0.2 * accuracy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Speed => "speed",
            Priority::Accuracy => "accuracy",
            Priority::Balanced => "balanced",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "speed" => Ok(Priority::Speed),
            "accuracy" => Ok(Priority::Accuracy),
            "balanced" => Ok(Priority::Balanced),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

/// A ranked candidate
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    pub backend: String,
    pub score: f64,
}

type RecordKey = (String, String);

/// Scores the catalog and accumulates outcome statistics.
#[derive(Debug, Clone)]
pub struct BackendScorer {
    catalog: Vec<BackendConfig>,
    weights: ScoringWeights,
    profiles: HashMap<String, BackendProfile>,
    records: HashMap<RecordKey, PerformanceRecord>,
    revision: u64,
}

impl BackendScorer {
    /// The catalog order is the tie-break order.
    pub fn new(catalog: Vec<BackendConfig>, weights: ScoringWeights) -> Self {
        Self {
            catalog,
            weights,
            profiles: HashMap::new(),
            records: HashMap::new(),
            revision: 0,
        }
    }

    /// Install persisted records, replacing any existing pairing.
    pub fn seed(&mut self, records: impl IntoIterator<Item = PerformanceRecord>) -> usize {
        let mut count = 0;
        for record in records {
            if !record.is_sane() {
                tracing::warn!(
                    backend = %record.backend,
                    task_type = %record.task_type,
                    "Ignoring malformed performance record"
                );
                continue;
            }
            self.records
                .insert((record.backend.clone(), record.task_type.clone()), record);
            count += 1;
        }
        count
    }

    pub fn catalog(&self) -> &[BackendConfig] {
        &self.catalog
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn backend(&self, name: &str) -> Option<&BackendConfig> {
        self.catalog.iter().find(|b| b.name == name)
    }

    pub fn profile(&self, name: &str) -> Option<&BackendProfile> {
        self.profiles.get(name)
    }

    /// History for a pairing, falling back to the backend's general record.
    pub fn record(&self, backend: &str, task: TaskType) -> Option<&PerformanceRecord> {
        self.records
            .get(&(backend.to_string(), task.as_str().to_string()))
            .or_else(|| {
                self.records
                    .get(&(backend.to_string(), GENERAL_TASK.to_string()))
            })
    }

    /// Score every catalog entry without side effects, in catalog order.
    pub fn rank(
        &self,
        task: TaskType,
        language: &str,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> Vec<Ranked> {
        let ctx = ScoreContext {
            task,
            language,
            priority,
            now,
        };
        self.catalog
            .iter()
            .map(|backend| {
                let candidate = Candidate {
                    backend,
                    profile: self.profiles.get(&backend.name),
                    record: self.record(&backend.name, task),
                };
                Ranked {
                    backend: backend.name.clone(),
                    score: score_backend(&candidate, &ctx, &self.weights),
                }
            })
            .collect()
    }

    /// Pick the highest-scoring backend and stamp it as used.
    ///
    /// Ties go to the earliest catalog entry.
    pub fn best_backend(
        &mut self,
        task: TaskType,
        language: &str,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> Option<Ranked> {
        let mut best: Option<Ranked> = None;
        for ranked in self.rank(task, language, priority, now) {
            match &best {
                Some(current) if ranked.score <= current.score => {}
                _ => best = Some(ranked),
            }
        }

        let winner = best?;
        self.profiles
            .entry(winner.backend.clone())
            .or_default()
            .mark_used(now);
        tracing::debug!(
            backend = %winner.backend,
            score = winner.score,
            task_type = %task,
            language,
            priority = %priority,
            "Selected backend"
        );
        Some(winner)
    }

    /// Count a request as in flight against its backend.
    pub fn begin_request(&mut self, backend: &str) {
        let cap = self.max_concurrency(backend);
        self.profiles
            .entry(backend.to_string())
            .or_default()
            .begin_request(cap);
    }

    /// Fold a finished request into the profile and the pairing record.
    ///
    /// Backends outside the catalog (for example a secondary process serving
    /// a different model) still get a record.
    pub fn record_outcome(
        &mut self,
        backend: &str,
        task: TaskType,
        response_ms: f64,
        success: bool,
        now: DateTime<Utc>,
    ) {
        self.profiles
            .entry(backend.to_string())
            .or_default()
            .record_sample(response_ms, success);

        self.records
            .entry((backend.to_string(), task.as_str().to_string()))
            .and_modify(|r| r.absorb(response_ms, success, now))
            .or_insert_with(|| PerformanceRecord::first(backend, task.as_str(), response_ms, success, now));
        self.revision += 1;

        tracing::debug!(
            backend,
            task_type = %task,
            response_ms,
            success,
            "Recorded outcome"
        );
    }

    /// Release an in-flight slot taken by [`begin_request`](Self::begin_request).
    pub fn end_request(&mut self, backend: &str) {
        let cap = self.max_concurrency(backend);
        if let Some(profile) = self.profiles.get_mut(backend) {
            profile.finish_request(cap);
        }
    }

    /// All pairing records, sorted for stable output.
    pub fn snapshot(&self) -> Vec<PerformanceRecord> {
        let mut records: Vec<_> = self.records.values().cloned().collect();
        records.sort_by(|a, b| {
            a.backend
                .cmp(&b.backend)
                .then_with(|| a.task_type.cmp(&b.task_type))
        });
        records
    }

    /// Bumped on every recorded outcome.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn max_concurrency(&self, backend: &str) -> u32 {
        self.backend(backend).map(|b| b.max_concurrency).unwrap_or(1)
    }
}
