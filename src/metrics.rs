// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for the tiering engine.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host process is responsible for choosing the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `tiering_engine_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//! - `_bytes` suffix for size gauges
//!
//! # Labels
//! - `tier`: memory, ssd, disk
//! - `event`: create, read, write, delete
//! - `agent`: admission, replacement
//! - `outcome`: operation-specific result

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record a cache event and how it was handled
pub fn record_event(event: &str, outcome: &str) {
    counter!(
        "tiering_engine_events_total",
        "event" => event.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record an event that contradicted the engine's view of an object
pub fn record_inconsistent_request(event: &str) {
    counter!(
        "tiering_engine_inconsistent_requests_total",
        "event" => event.to_string()
    )
    .increment(1);
}

/// Record an admission placement
pub fn record_admission(position: &str, is_read: bool) {
    let path = if is_read { "read" } else { "write" };
    counter!(
        "tiering_engine_admissions_total",
        "position" => position.to_string(),
        "path" => path
    )
    .increment(1);
}

/// Record a replacement scan result
pub fn record_replacement(tier: &str, outcome: &str, scanned: usize) {
    counter!(
        "tiering_engine_replacements_total",
        "tier" => tier.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    histogram!(
        "tiering_engine_replacement_scan_length",
        "tier" => tier.to_string()
    )
    .record(scanned as f64);
}

/// Record a delete-or-downgrade verdict
pub fn record_delete_or_downgrade(verdict: &str) {
    counter!(
        "tiering_engine_delete_or_downgrade_total",
        "verdict" => verdict.to_string()
    )
    .increment(1);
}

/// Record a cache miss reported by the host
pub fn record_miss(known: bool) {
    let known = if known { "true" } else { "false" };
    counter!(
        "tiering_engine_misses_total",
        "known" => known
    )
    .increment(1);
}

/// Record a state that could not be encoded
pub fn record_encoding_error(operation: &str) {
    counter!(
        "tiering_engine_encoding_errors_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

// ═══════════════════════════════════════════════════════════════════════════
// LEARNING - Pass scheduling and outcomes
// ═══════════════════════════════════════════════════════════════════════════

/// Record a learning pass request (queued, coalesced, closed)
pub fn record_learning_scheduled(outcome: &str) {
    counter!(
        "tiering_engine_learning_scheduled_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record one agent's share of a learning pass
pub fn record_learning_pass(agent: &str, updated: usize, pruned: usize, mean_reward: f64) {
    counter!(
        "tiering_engine_decisions_updated_total",
        "agent" => agent.to_string()
    )
    .increment(updated as u64);
    counter!(
        "tiering_engine_decisions_pruned_total",
        "agent" => agent.to_string()
    )
    .increment(pruned as u64);
    histogram!(
        "tiering_engine_mean_reward",
        "agent" => agent.to_string()
    )
    .record(mean_reward);
}

/// Record a full learning pass duration
pub fn record_learning_duration(duration: Duration) {
    histogram!("tiering_engine_learning_pass_seconds").record(duration.as_secs_f64());
}

/// Set pending decisions for an agent
pub fn set_pending_decisions(agent: &str, count: usize) {
    gauge!(
        "tiering_engine_pending_decisions",
        "agent" => agent.to_string()
    )
    .set(count as f64);
}

/// Set the number of learned states for an agent
pub fn set_q_table_states(agent: &str, count: usize) {
    gauge!(
        "tiering_engine_q_table_states",
        "agent" => agent.to_string()
    )
    .set(count as f64);
}

// ═══════════════════════════════════════════════════════════════════════════
// OCCUPANCY - Tier fill and registry sizes
// ═══════════════════════════════════════════════════════════════════════════

/// Set bytes charged to a tier
pub fn set_occupancy_bytes(tier: &str, bytes: u64) {
    gauge!(
        "tiering_engine_occupancy_bytes",
        "tier" => tier.to_string()
    )
    .set(bytes as f64);
}

/// Set tier fill ratio (0.0 - 1.0, may exceed 1.0 when over capacity)
pub fn set_occupancy_ratio(tier: &str, ratio: f64) {
    gauge!(
        "tiering_engine_occupancy_ratio",
        "tier" => tier.to_string()
    )
    .set(ratio);
}

/// Set registry entry count (objects, deleted, types, directories)
pub fn set_registry_size(registry: &str, count: usize) {
    gauge!(
        "tiering_engine_registry_entries",
        "registry" => registry.to_string()
    )
    .set(count as f64);
}

/// Set tracked keys in a tier's recency list
pub fn set_recency_entries(tier: &str, count: usize) {
    gauge!(
        "tiering_engine_recency_entries",
        "tier" => tier.to_string()
    )
    .set(count as f64);
}

/// Set learner worker state
pub fn set_learner_state(state: &str) {
    gauge!(
        "tiering_engine_learner_state",
        "state" => state.to_string()
    )
    .set(1.0);
}

// ═══════════════════════════════════════════════════════════════════════════
// LATENCY
// ═══════════════════════════════════════════════════════════════════════════

/// Record API call latency
pub fn record_latency(operation: &str, duration: Duration) {
    histogram!(
        "tiering_engine_operation_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Timer guard that records latency on drop
pub struct LatencyTimer {
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.operation, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    type Sample = (String, Vec<(String, String)>, DebugValue);

    /// Run `f` against a thread-local debugging recorder and return what it saw.
    fn capture(f: impl FnOnce()) -> Vec<Sample> {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        metrics::with_local_recorder(&recorder, f);
        snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .map(|(composite, _, _, value)| {
                let (_, key) = composite.into_parts();
                let labels = key
                    .labels()
                    .map(|l| (l.key().to_string(), l.value().to_string()))
                    .collect();
                (key.name().to_string(), labels, value)
            })
            .collect()
    }

    fn find<'a>(samples: &'a [Sample], name: &str, labels: &[(&str, &str)]) -> &'a DebugValue {
        samples
            .iter()
            .find(|(n, l, _)| {
                n == name
                    && labels
                        .iter()
                        .all(|(k, v)| l.iter().any(|(lk, lv)| lk == k && lv == v))
            })
            .map(|(_, _, value)| value)
            .unwrap_or_else(|| panic!("metric {name} {labels:?} not recorded"))
    }

    #[test]
    fn test_event_metrics() {
        let samples = capture(|| {
            record_event("create", "applied");
            record_event("create", "applied");
            record_event("delete", "ignored");
            record_inconsistent_request("read");
            record_miss(true);
            record_encoding_error("admission");
        });

        assert_eq!(
            find(
                &samples,
                "tiering_engine_events_total",
                &[("event", "create"), ("outcome", "applied")]
            ),
            &DebugValue::Counter(2)
        );
        assert_eq!(
            find(
                &samples,
                "tiering_engine_events_total",
                &[("event", "delete"), ("outcome", "ignored")]
            ),
            &DebugValue::Counter(1)
        );
        assert_eq!(
            find(&samples, "tiering_engine_misses_total", &[("known", "true")]),
            &DebugValue::Counter(1)
        );
    }

    #[test]
    fn test_replacement_records_scan_length() {
        let samples = capture(|| record_replacement("memory", "evict_to_lower_tier", 3));

        assert_eq!(
            find(
                &samples,
                "tiering_engine_replacements_total",
                &[("tier", "memory"), ("outcome", "evict_to_lower_tier")]
            ),
            &DebugValue::Counter(1)
        );
        match find(&samples, "tiering_engine_replacement_scan_length", &[("tier", "memory")]) {
            DebugValue::Histogram(values) => {
                assert_eq!(values.len(), 1);
                assert_eq!(values[0].into_inner(), 3.0);
            }
            other => panic!("expected histogram, got {other:?}"),
        }
    }

    #[test]
    fn test_learning_pass_metrics() {
        let samples = capture(|| {
            record_learning_scheduled("queued");
            record_learning_pass("admission", 10, 2, 0.5);
            set_pending_decisions("replacement", 7);
        });

        assert_eq!(
            find(&samples, "tiering_engine_decisions_updated_total", &[("agent", "admission")]),
            &DebugValue::Counter(10)
        );
        assert_eq!(
            find(&samples, "tiering_engine_decisions_pruned_total", &[("agent", "admission")]),
            &DebugValue::Counter(2)
        );
        match find(&samples, "tiering_engine_pending_decisions", &[("agent", "replacement")]) {
            DebugValue::Gauge(value) => assert_eq!(value.into_inner(), 7.0),
            other => panic!("expected gauge, got {other:?}"),
        }
    }

    #[test]
    fn test_occupancy_gauges_keep_last_value() {
        let samples = capture(|| {
            set_occupancy_bytes("memory", 1024);
            set_occupancy_bytes("memory", 512);
            set_occupancy_ratio("disk", 0.25);
        });

        match find(&samples, "tiering_engine_occupancy_bytes", &[("tier", "memory")]) {
            DebugValue::Gauge(value) => assert_eq!(value.into_inner(), 512.0),
            other => panic!("expected gauge, got {other:?}"),
        }
        match find(&samples, "tiering_engine_occupancy_ratio", &[("tier", "disk")]) {
            DebugValue::Gauge(value) => assert_eq!(value.into_inner(), 0.25),
            other => panic!("expected gauge, got {other:?}"),
        }
    }

    #[test]
    fn test_latency_timer_records_on_drop() {
        let samples = capture(|| {
            let _timer = LatencyTimer::new("request_admission");
            std::thread::sleep(Duration::from_micros(10));
        });

        match find(
            &samples,
            "tiering_engine_operation_seconds",
            &[("operation", "request_admission")],
        ) {
            DebugValue::Histogram(values) => {
                assert_eq!(values.len(), 1);
                assert!(values[0].into_inner() > 0.0);
            }
            other => panic!("expected histogram, got {other:?}"),
        }
    }
}
