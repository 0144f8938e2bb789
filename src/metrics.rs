//! Per-engine metrics aggregation.
//!
//! The aggregator is the only shared mutable state in the crate. Every
//! recorded check applies all of its counter updates under one lock, so
//! readers never observe a partially applied check and `reset` never
//! interleaves with an in-flight `record_check`.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MetricsConfig;
use crate::types::{CheckResult, Severity, ViolationCategory};

/// A pattern key with its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternCount {
    /// Stable rule key.
    pub pattern: String,
    /// Number of times the rule fired.
    pub count: u64,
}

/// One entry in the recent-violations log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentViolation {
    /// Category of the violation.
    pub category: ViolationCategory,
    /// When it was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Immutable snapshot of the engine's metrics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Metrics {
    /// Total checks recorded.
    pub total_requests: u64,
    /// Checks that returned `is_allowed == false`.
    pub blocked_requests: u64,
    /// Violation counts per category.
    pub violations_by_type: BTreeMap<ViolationCategory, u64>,
    /// Violation counts per severity.
    pub violations_by_severity: BTreeMap<Severity, u64>,
    /// Most frequently firing rules, count descending, ties broken by
    /// first-seen order.
    pub top_patterns: Vec<PatternCount>,
    /// Bounded log of recent violations, oldest first.
    pub recent_violations: Vec<RecentViolation>,
}

#[derive(Debug, Default)]
struct MetricsState {
    total_requests: u64,
    blocked_requests: u64,
    violations_by_type: BTreeMap<ViolationCategory, u64>,
    violations_by_severity: BTreeMap<Severity, u64>,
    // Insertion order doubles as first-seen order for tie-breaking.
    pattern_counts: Vec<(String, u64)>,
    recent_violations: VecDeque<RecentViolation>,
}

/// Mutex-guarded metrics store owned by one engine instance.
#[derive(Debug)]
pub struct MetricsAggregator {
    state: Mutex<MetricsState>,
    recent_capacity: usize,
    top_patterns_limit: usize,
}

impl MetricsAggregator {
    /// Create an empty aggregator.
    pub fn new(config: &MetricsConfig) -> Self {
        Self {
            state: Mutex::new(MetricsState::default()),
            recent_capacity: config.recent_capacity,
            top_patterns_limit: config.top_patterns_limit,
        }
    }

    /// Record one check as a single atomic update.
    pub fn record_check(&self, result: &CheckResult) {
        let now = Utc::now();
        let mut state = self.lock();

        state.total_requests += 1;
        if !result.is_allowed {
            state.blocked_requests += 1;
        }

        for violation in &result.violations {
            *state.violations_by_type.entry(violation.category).or_insert(0) += 1;
            *state
                .violations_by_severity
                .entry(violation.severity)
                .or_insert(0) += 1;

            match state
                .pattern_counts
                .iter()
                .position(|(key, _)| *key == violation.pattern_key)
            {
                Some(i) => state.pattern_counts[i].1 += 1,
                None => state.pattern_counts.push((violation.pattern_key.clone(), 1)),
            }

            if state.recent_violations.len() == self.recent_capacity {
                state.recent_violations.pop_front();
            }
            state.recent_violations.push_back(RecentViolation {
                category: violation.category,
                timestamp: now,
            });
        }
    }

    /// Take an immutable snapshot of the current state.
    pub fn snapshot(&self) -> Metrics {
        let state = self.lock();

        let mut top_patterns: Vec<PatternCount> = state
            .pattern_counts
            .iter()
            .map(|(pattern, count)| PatternCount {
                pattern: pattern.clone(),
                count: *count,
            })
            .collect();
        // Stable sort: equal counts keep first-seen order.
        top_patterns.sort_by(|a, b| b.count.cmp(&a.count));
        top_patterns.truncate(self.top_patterns_limit);

        Metrics {
            total_requests: state.total_requests,
            blocked_requests: state.blocked_requests,
            violations_by_type: state.violations_by_type.clone(),
            violations_by_severity: state.violations_by_severity.clone(),
            top_patterns,
            recent_violations: state.recent_violations.iter().cloned().collect(),
        }
    }

    /// Atomically zero all counters and clear the ring buffer.
    pub fn reset(&self) {
        *self.lock() = MetricsState::default();
    }

    // A poisoned lock means a panic elsewhere while recording; the
    // counters are still structurally valid, and refusing to return a
    // verdict would be worse than a possibly short count.
    fn lock(&self) -> std::sync::MutexGuard<'_, MetricsState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
