//! Live per-backend statistics and persisted per-pairing records

use super::score::ScoringWeights;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Samples kept in each rolling window
pub const WINDOW_SIZE: usize = 50;

/// Rolling statistics for one backend, across all task types.
#[derive(Debug, Clone, Default)]
pub struct BackendProfile {
    response_times_ms: VecDeque<f64>,
    outcomes: VecDeque<bool>,
    /// Completed requests
    pub usage_count: u64,
    /// Last time the scorer selected this backend
    pub last_used_at: Option<DateTime<Utc>>,
    in_flight: u32,
    current_load: f64,
}

impl BackendProfile {
    /// Push one completed request into the rolling windows.
    pub fn record_sample(&mut self, response_ms: f64, success: bool) {
        if self.response_times_ms.len() == WINDOW_SIZE {
            self.response_times_ms.pop_front();
        }
        self.response_times_ms.push_back(response_ms);
        if self.outcomes.len() == WINDOW_SIZE {
            self.outcomes.pop_front();
        }
        self.outcomes.push_back(success);
        self.usage_count += 1;
    }

    pub fn avg_response_ms(&self) -> Option<f64> {
        if self.response_times_ms.is_empty() {
            return None;
        }
        Some(self.response_times_ms.iter().sum::<f64>() / self.response_times_ms.len() as f64)
    }

    pub fn success_rate(&self) -> Option<f64> {
        if self.outcomes.is_empty() {
            return None;
        }
        let ok = self.outcomes.iter().filter(|o| **o).count();
        Some(ok as f64 / self.outcomes.len() as f64)
    }

    pub fn samples(&self) -> usize {
        self.response_times_ms.len()
    }

    /// Load estimate in 0.0..=1.0
    pub fn current_load(&self) -> f64 {
        self.current_load
    }

    pub fn in_flight(&self) -> u32 {
        self.in_flight
    }

    pub fn mark_used(&mut self, at: DateTime<Utc>) {
        self.last_used_at = Some(at);
    }

    pub fn begin_request(&mut self, max_concurrency: u32) {
        self.in_flight = self.in_flight.saturating_add(1);
        self.update_load(max_concurrency);
    }

    pub fn finish_request(&mut self, max_concurrency: u32) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.update_load(max_concurrency);
    }

    fn update_load(&mut self, max_concurrency: u32) {
        let cap = max_concurrency.max(1) as f64;
        self.current_load = (self.in_flight as f64 / cap).min(1.0);
    }
}

/// Aggregate statistics for one (backend, task type) pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRecord {
    pub backend: String,
    pub task_type: String,
    pub avg_response_time_ms: f64,
    pub success_rate: f64,
    pub usage_count: u64,
    pub last_used: DateTime<Utc>,
}

impl PerformanceRecord {
    /// Record created by the first observation of a pairing.
    pub fn first(
        backend: impl Into<String>,
        task_type: impl Into<String>,
        response_ms: f64,
        success: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            backend: backend.into(),
            task_type: task_type.into(),
            avg_response_time_ms: response_ms,
            success_rate: if success { 1.0 } else { 0.0 },
            usage_count: 1,
            last_used: now,
        }
    }

    /// Fold one observation into the running means.
    pub fn absorb(&mut self, response_ms: f64, success: bool, now: DateTime<Utc>) {
        let n = self.usage_count as f64;
        let outcome = if success { 1.0 } else { 0.0 };
        self.avg_response_time_ms = (self.avg_response_time_ms * n + response_ms) / (n + 1.0);
        self.success_rate = (self.success_rate * n + outcome) / (n + 1.0);
        self.usage_count += 1;
        self.last_used = now;
    }

    /// Composite of success rate and speed in 0.0..=1.0
    pub fn historical_score(&self, weights: &ScoringWeights) -> f64 {
        let latency = 1.0 - (self.avg_response_time_ms / weights.latency_ceiling_ms).clamp(0.0, 1.0);
        weights.success_weight * self.success_rate.clamp(0.0, 1.0) + weights.latency_weight * latency
    }

    /// Records loaded from disk may carry garbage; reject what the scorer cannot use.
    pub fn is_sane(&self) -> bool {
        !self.backend.is_empty()
            && !self.task_type.is_empty()
            && self.avg_response_time_ms.is_finite()
            && self.avg_response_time_ms >= 0.0
            && (0.0..=1.0).contains(&self.success_rate)
    }
}
