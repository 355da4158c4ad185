//! Metrics collection.
//!
//! This module provides:
//! - Per rule-set invocation counts
//! - Per rule hit counts
//! - Suspicious-input counts
//! - Rate-limit admit/deny totals
//!
//! # Example
//!
//! ```
//! use trust_boundary::metrics::MetricsCollector;
//! use trust_boundary::security::RuleSet;
//!
//! let metrics = MetricsCollector::new();
//! let report = RuleSet::display().apply_with_report("<script>x</script>ok");
//! metrics.record_report(&report, 12);
//! metrics.record_rate_limit(true);
//! metrics.record_rate_limit(false);
//!
//! let summary = metrics.summary();
//! assert_eq!(summary.total_invocations, 1);
//! assert_eq!(summary.suspicious_inputs, 1);
//! assert_eq!(summary.rate_limit.denied, 1);
//! ```

// Allow intentional numeric casts for metrics calculations
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::security::{RuleKind, SanitizeReport};

/// Maximum number of events kept in the circular buffer.
const MAX_EVENTS: usize = 10_000;

/// One sanitizer invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizeEvent {
    /// Rule set that ran.
    pub rule_set: String,
    /// Rules that removed characters.
    pub fired: Vec<RuleKind>,
    /// Total characters removed.
    pub removed_chars: usize,
    /// Whether a threat-marker rule fired.
    pub suspicious: bool,
    /// Latency in microseconds.
    pub latency_us: u64,
    /// Timestamp of the event (Unix epoch seconds).
    pub timestamp: u64,
}

impl SanitizeEvent {
    /// Build an event from a report.
    #[must_use]
    pub fn from_report(report: &SanitizeReport, latency_us: u64) -> Self {
        Self {
            rule_set: report.rule_set.clone(),
            fired: report.hits.iter().map(|h| h.kind).collect(),
            removed_chars: report.hits.iter().map(|h| h.removed_chars).sum(),
            suspicious: report.is_suspicious(),
            latency_us,
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }
}

/// Summary statistics for one rule set.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RuleSetSummary {
    /// Total invocations.
    pub invocations: u64,
    /// Invocations where any rule removed characters.
    pub changed: u64,
    /// Invocations where a threat-marker rule fired.
    pub suspicious: u64,
    /// Total characters removed.
    pub removed_chars: u64,
    /// Average latency in microseconds.
    pub avg_latency_us: f64,
}

/// Rate-limit decision totals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RateLimitSummary {
    /// Requests admitted.
    pub allowed: u64,
    /// Requests denied.
    pub denied: u64,
}

/// Overall metrics summary.
///
/// `total_invocations` counts every invocation since creation or the last
/// [`MetricsCollector::clear`]. The other sanitizer figures cover only the
/// retained events, of which there are `recent_invocations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    /// Sanitizer invocations across all rule sets, including evicted events.
    pub total_invocations: u64,
    /// Invocations still held in the event buffer.
    pub recent_invocations: u64,
    /// Retained invocations flagged suspicious.
    pub suspicious_inputs: u64,
    /// Per rule-set summaries over retained events.
    pub by_rule_set: HashMap<String, RuleSetSummary>,
    /// Hit counts per rule kind over retained events.
    pub rule_hits: HashMap<RuleKind, u64>,
    /// Rate-limit totals.
    pub rate_limit: RateLimitSummary,
}

/// Thread-safe metrics collector.
///
/// A poisoned lock never loses data: writers and readers recover the inner
/// value and log the event.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    events: RwLock<VecDeque<SanitizeEvent>>,
    invocations: AtomicU64,
    rate_limit: RwLock<RateLimitSummary>,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sanitizer invocation.
    ///
    /// Keeps at most `MAX_EVENTS` events, dropping the oldest.
    pub fn record(&self, event: SanitizeEvent) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        let mut events = write_recovering(&self.events, "events");
        if events.len() >= MAX_EVENTS {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Record a sanitizer invocation from its report.
    pub fn record_report(&self, report: &SanitizeReport, latency_us: u64) {
        self.record(SanitizeEvent::from_report(report, latency_us));
    }

    /// Record a rate-limit decision.
    pub fn record_rate_limit(&self, allowed: bool) {
        let mut totals = write_recovering(&self.rate_limit, "rate limit totals");
        if allowed {
            totals.allowed += 1;
        } else {
            totals.denied += 1;
        }
    }

    /// Get summary statistics.
    #[must_use]
    pub fn summary(&self) -> MetricsSummary {
        let events: Vec<SanitizeEvent> = read_recovering(&self.events, "events")
            .iter()
            .cloned()
            .collect();
        let rate_limit = *read_recovering(&self.rate_limit, "rate limit totals");

        let mut by_rule_set: HashMap<String, RuleSetSummary> = HashMap::new();
        let mut latency_totals: HashMap<String, u64> = HashMap::new();
        let mut rule_hits: HashMap<RuleKind, u64> = HashMap::new();

        for event in &events {
            let summary = by_rule_set.entry(event.rule_set.clone()).or_default();
            summary.invocations += 1;
            if !event.fired.is_empty() {
                summary.changed += 1;
            }
            if event.suspicious {
                summary.suspicious += 1;
            }
            summary.removed_chars += event.removed_chars as u64;
            *latency_totals.entry(event.rule_set.clone()).or_default() += event.latency_us;

            for kind in &event.fired {
                *rule_hits.entry(*kind).or_default() += 1;
            }
        }

        for (name, summary) in &mut by_rule_set {
            let total = latency_totals.get(name).copied().unwrap_or(0);
            summary.avg_latency_us = total as f64 / summary.invocations as f64;
        }

        MetricsSummary {
            total_invocations: self.invocations.load(Ordering::Relaxed),
            recent_invocations: events.len() as u64,
            suspicious_inputs: events.iter().filter(|e| e.suspicious).count() as u64,
            by_rule_set,
            rule_hits,
            rate_limit,
        }
    }

    /// Get recent suspicious events, newest last.
    #[must_use]
    pub fn suspicious_events(&self) -> Vec<SanitizeEvent> {
        read_recovering(&self.events, "events")
            .iter()
            .filter(|e| e.suspicious)
            .cloned()
            .collect()
    }

    /// Clear all metrics (useful for testing).
    pub fn clear(&self) {
        write_recovering(&self.events, "events").clear();
        self.invocations.store(0, Ordering::Relaxed);
        *write_recovering(&self.rate_limit, "rate limit totals") = RateLimitSummary::default();
    }
}

fn read_recovering<'a, T>(lock: &'a RwLock<T>, what: &str) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poison_error| {
        tracing::warn!(
            lock = what,
            error = %poison_error,
            "Reading metrics from poisoned lock, using recovered data"
        );
        poison_error.into_inner()
    })
}

fn write_recovering<'a, T>(lock: &'a RwLock<T>, what: &str) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poison_error| {
        tracing::warn!(
            lock = what,
            error = %poison_error,
            "Writing metrics to poisoned lock, using recovered data"
        );
        poison_error.into_inner()
    })
}

/// Timer for measuring operation latency.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time in microseconds.
    #[must_use]
    pub fn elapsed_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::security::RuleSet;

    fn report(rule_set: &RuleSet, input: &str) -> SanitizeReport {
        rule_set.apply_with_report(input)
    }

    #[test]
    fn test_event_from_report() {
        let report = report(&RuleSet::prompt_input(), "  [SYSTEM] hi  ");
        let event = SanitizeEvent::from_report(&report, 40);
        assert_eq!(event.rule_set, "prompt_input");
        assert!(event.fired.contains(&RuleKind::PhraseDenylist));
        assert!(event.fired.contains(&RuleKind::Trim));
        assert!(event.suspicious);
        assert_eq!(event.removed_chars, 13);
        assert_eq!(event.latency_us, 40);
        assert!(event.timestamp > 0);
    }

    #[test]
    fn test_summary_by_rule_set() {
        let collector = MetricsCollector::new();
        let display = RuleSet::display();
        let tag = RuleSet::skill_tag(50);
        collector.record_report(&report(&display, "<script>x</script>"), 10);
        collector.record_report(&report(&display, "clean"), 30);
        collector.record_report(&report(&tag, "Rust!"), 5);

        let summary = collector.summary();
        assert_eq!(summary.total_invocations, 3);
        assert_eq!(summary.suspicious_inputs, 1);

        let display_summary = summary.by_rule_set.get("display").unwrap();
        assert_eq!(display_summary.invocations, 2);
        assert_eq!(display_summary.changed, 1);
        assert_eq!(display_summary.suspicious, 1);
        assert_eq!(display_summary.removed_chars, 18);
        assert_eq!(display_summary.avg_latency_us, 20.0);

        let tag_summary = summary.by_rule_set.get("skill_tag").unwrap();
        assert_eq!(tag_summary.changed, 1);
        assert_eq!(tag_summary.suspicious, 0);

        assert_eq!(summary.rule_hits.get(&RuleKind::TagStrip), Some(&1));
        assert_eq!(summary.rule_hits.get(&RuleKind::CharsetAllowlist), Some(&1));
    }

    #[test]
    fn test_rate_limit_totals() {
        let collector = MetricsCollector::new();
        collector.record_rate_limit(true);
        collector.record_rate_limit(true);
        collector.record_rate_limit(false);
        let summary = collector.summary();
        assert_eq!(
            summary.rate_limit,
            RateLimitSummary {
                allowed: 2,
                denied: 1
            }
        );
    }

    #[test]
    fn test_suspicious_events() {
        let collector = MetricsCollector::new();
        let display = RuleSet::display();
        collector.record_report(&report(&display, "fine"), 1);
        collector.record_report(&report(&display, "<b onclick='x'>"), 1);
        let suspicious = collector.suspicious_events();
        assert_eq!(suspicious.len(), 1);
        assert_eq!(suspicious[0].fired, vec![RuleKind::AttributeStrip]);
    }

    #[test]
    fn test_event_buffer_is_bounded() {
        let collector = MetricsCollector::new();
        let clean = report(&RuleSet::display(), "clean");
        for _ in 0..MAX_EVENTS + 5 {
            collector.record_report(&clean, 1);
        }
        let summary = collector.summary();
        assert_eq!(summary.recent_invocations, MAX_EVENTS as u64);
        assert_eq!(summary.total_invocations, MAX_EVENTS as u64 + 5);
        assert_eq!(summary.by_rule_set["display"].invocations, MAX_EVENTS as u64);
    }

    #[test]
    fn test_clear() {
        let collector = MetricsCollector::new();
        collector.record_report(&report(&RuleSet::display(), "x"), 1);
        collector.record_rate_limit(false);
        collector.clear();
        let summary = collector.summary();
        assert_eq!(summary.total_invocations, 0);
        assert_eq!(summary.recent_invocations, 0);
        assert_eq!(summary.rate_limit, RateLimitSummary::default());
        assert!(summary.by_rule_set.is_empty());
    }

    #[test]
    fn test_summary_serialize() {
        let collector = MetricsCollector::new();
        collector.record_report(&report(&RuleSet::display(), "<script></script>"), 1);
        let json = serde_json::to_value(collector.summary()).unwrap();
        assert_eq!(json["total_invocations"], 1);
        assert_eq!(json["rule_hits"]["tag_strip"], 1);
    }

    fn poison<T: Send + Sync>(lock: &RwLock<T>) {
        std::thread::scope(|s| {
            let result = s
                .spawn(|| {
                    let _guard = lock.write().unwrap();
                    panic!("writer died holding the lock");
                })
                .join();
            assert!(result.is_err());
        });
        assert!(lock.is_poisoned());
    }

    #[test]
    fn test_poisoned_event_lock_keeps_recording() {
        let collector = MetricsCollector::new();
        let display = RuleSet::display();
        collector.record_report(&report(&display, "<script>x</script>"), 1);
        poison(&collector.events);

        collector.record_report(&report(&display, "clean"), 1);

        let summary = collector.summary();
        assert_eq!(summary.total_invocations, 2);
        assert_eq!(summary.recent_invocations, 2);
        assert_eq!(summary.suspicious_inputs, 1);
        assert_eq!(collector.suspicious_events().len(), 1);

        collector.clear();
        assert_eq!(collector.summary().recent_invocations, 0);
    }

    #[test]
    fn test_poisoned_rate_limit_lock_keeps_counting() {
        let collector = MetricsCollector::new();
        collector.record_rate_limit(true);
        poison(&collector.rate_limit);

        collector.record_rate_limit(false);
        assert_eq!(
            collector.summary().rate_limit,
            RateLimitSummary {
                allowed: 1,
                denied: 1
            }
        );
    }

    #[test]
    fn test_timer() {
        let timer = Timer::start();
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(timer.elapsed_us() >= 2_000);
    }
}
