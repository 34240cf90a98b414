//! Scoring function for adaptive backend selection

use super::profile::{BackendProfile, PerformanceRecord};
use super::Priority;
use crate::config::BackendConfig;
use crate::task::TaskType;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Weights and penalties applied when scoring backend candidates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Historical score assumed for a pairing with no observations (0.0-1.0)
    pub neutral_prior: f64,

    /// Observations after which history fully replaces the prior
    pub reliability_samples: u32,

    /// Share of the historical score carried by success rate
    pub success_weight: f64,

    /// Share of the historical score carried by response time
    pub latency_weight: f64,

    /// Response time at which the latency component reaches zero
    pub latency_ceiling_ms: f64,

    /// Bonus when the request language is among the backend's specialties
    pub language_boost: f64,

    /// Rolling average above which a backend counts as slow under speed priority
    pub slow_response_ms: f64,

    /// Multiplier applied to slow backends
    pub slow_penalty: f64,

    /// Load above which a backend is penalized (0.0-1.0)
    pub load_threshold: f64,

    /// Multiplier applied to loaded backends
    pub load_penalty: f64,

    /// A backend selected within this window is penalized
    pub recency_window_seconds: u64,

    /// Multiplier applied to recently used backends
    pub recency_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            neutral_prior: 0.5,
            reliability_samples: 10,
            success_weight: 0.6,
            latency_weight: 0.4,
            latency_ceiling_ms: 10_000.0,
            language_boost: 0.1,
            slow_response_ms: 5_000.0,
            slow_penalty: 0.8,
            load_threshold: 0.8,
            load_penalty: 0.7,
            recency_window_seconds: 300,
            recency_penalty: 0.9,
        }
    }
}

impl ScoringWeights {
    /// Validate ranges and that the historical blend sums to 1.0
    pub fn validate(&self) -> Result<(), String> {
        let sum = self.success_weight + self.latency_weight;
        if (sum - 1.0).abs() > 1e-9 {
            return Err(format!(
                "success_weight and latency_weight must sum to 1.0, got {}",
                sum
            ));
        }
        if !(0.0..=1.0).contains(&self.neutral_prior) {
            return Err(format!(
                "neutral_prior must be within 0.0..=1.0, got {}",
                self.neutral_prior
            ));
        }
        if self.reliability_samples == 0 {
            return Err("reliability_samples must be non-zero".to_string());
        }
        if self.latency_ceiling_ms <= 0.0 {
            return Err("latency_ceiling_ms must be positive".to_string());
        }
        for (name, value) in [
            ("slow_penalty", self.slow_penalty),
            ("load_penalty", self.load_penalty),
            ("recency_penalty", self.recency_penalty),
        ] {
            if value <= 0.0 || value > 1.0 {
                return Err(format!("{} must be within (0.0, 1.0], got {}", name, value));
            }
        }
        if !(0.0..=1.0).contains(&self.load_threshold) {
            return Err(format!(
                "load_threshold must be within 0.0..=1.0, got {}",
                self.load_threshold
            ));
        }
        Ok(())
    }

    pub fn recency_window(&self) -> Duration {
        Duration::seconds(self.recency_window_seconds.min(i64::MAX as u64) as i64)
    }
}

/// Everything known about one candidate at scoring time
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub backend: &'a BackendConfig,
    pub profile: Option<&'a BackendProfile>,
    pub record: Option<&'a PerformanceRecord>,
}

/// What the request asks for
#[derive(Debug, Clone, Copy)]
pub struct ScoreContext<'a> {
    pub task: TaskType,
    pub language: &'a str,
    pub priority: Priority,
    pub now: DateTime<Utc>,
}

/// Historical score of a pairing, blended toward the prior while samples are few
pub fn base_score(record: Option<&PerformanceRecord>, weights: &ScoringWeights) -> f64 {
    match record {
        Some(record) => {
            let reliability =
                (record.usage_count as f64 / weights.reliability_samples as f64).min(1.0);
            weights.neutral_prior * (1.0 - reliability)
                + record.historical_score(weights) * reliability
        }
        None => weights.neutral_prior,
    }
}

/// Score a backend for a request
///
/// Returns a non-negative score where higher is better. Pure: selection
/// side effects are applied by the caller.
pub fn score_backend(
    candidate: &Candidate<'_>,
    ctx: &ScoreContext<'_>,
    weights: &ScoringWeights,
) -> f64 {
    let backend = candidate.backend;
    let mut base = base_score(candidate.record, weights);

    if backend
        .languages
        .iter()
        .any(|l| l.eq_ignore_ascii_case(ctx.language))
    {
        base += weights.language_boost;
    }
    if backend.tasks.iter().any(|t| t == ctx.task.as_str()) {
        base += ctx.task.affinity_boost();
    }
    let base = base.clamp(0.0, 1.0);

    let mut score = ctx.priority.blend(base, backend.speed, backend.accuracy);

    if let Some(profile) = candidate.profile {
        if ctx.priority == Priority::Speed {
            if let Some(avg) = profile.avg_response_ms() {
                if avg > weights.slow_response_ms {
                    score *= weights.slow_penalty;
                }
            }
        }
        if profile.current_load() > weights.load_threshold {
            score *= weights.load_penalty;
        }
        if let Some(last) = profile.last_used_at {
            if ctx.now.signed_duration_since(last) < weights.recency_window() {
                score *= weights.recency_penalty;
            }
        }
    }

    score.max(0.0)
}
