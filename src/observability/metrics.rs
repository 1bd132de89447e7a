//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `edge_provider_reconciliations_total` - Reconcile ticks by kind and outcome
//! - `edge_provider_reconciliation_errors_total` - Failed reconcile ticks by kind and reason
//! - `edge_provider_reconciliation_duration_seconds` - Duration of reconcile ticks by kind
//! - `edge_provider_upstream_operations_total` - Upstream API calls by kind and operation
//! - `edge_provider_upstream_operation_errors_total` - Failed upstream API calls
//! - `edge_provider_upstream_operation_duration_seconds` - Duration of upstream API calls
//! - `edge_provider_cache_lookups_total` - Response cache lookups by kind and result
//! - `edge_provider_rate_limit_retries_total` - Rate-limit back-off retries by kind
//! - `edge_provider_reference_resolution_failures_total` - Failed reference resolutions
//! - `edge_provider_requeues_total` - Error requeues by kind

use anyhow::Result;
use prometheus::{HistogramVec, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "edge_provider_reconciliations_total",
            "Total number of reconcile ticks by kind and outcome",
        ),
        &["kind", "outcome"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "edge_provider_reconciliation_errors_total",
            "Total number of failed reconcile ticks by kind and reason",
        ),
        &["kind", "reason"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "edge_provider_reconciliation_duration_seconds",
            "Duration of reconcile ticks in seconds by kind",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 120.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static UPSTREAM_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "edge_provider_upstream_operations_total",
            "Total number of upstream API calls by kind and operation",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create UPSTREAM_OPERATIONS_TOTAL metric - this should never happen")
});

static UPSTREAM_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "edge_provider_upstream_operation_errors_total",
            "Total number of failed upstream API calls by kind and operation",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create UPSTREAM_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static UPSTREAM_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "edge_provider_upstream_operation_duration_seconds",
            "Duration of upstream API calls in seconds by kind and operation",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["kind", "operation"],
    )
    .expect("Failed to create UPSTREAM_OPERATION_DURATION metric - this should never happen")
});

static CACHE_LOOKUPS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "edge_provider_cache_lookups_total",
            "Total number of response cache lookups by kind and result",
        ),
        &["kind", "result"],
    )
    .expect("Failed to create CACHE_LOOKUPS_TOTAL metric - this should never happen")
});

static RATE_LIMIT_RETRIES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "edge_provider_rate_limit_retries_total",
            "Total number of rate-limit back-off retries by kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RATE_LIMIT_RETRIES_TOTAL metric - this should never happen")
});

static REFERENCE_FAILURES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "edge_provider_reference_resolution_failures_total",
            "Total number of failed reference resolutions by referencing kind",
        ),
        &["kind"],
    )
    .expect("Failed to create REFERENCE_FAILURES_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "edge_provider_requeues_total",
            "Total number of error requeues by kind",
        ),
        &["kind"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(UPSTREAM_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(UPSTREAM_OPERATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(UPSTREAM_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(CACHE_LOOKUPS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RATE_LIMIT_RETRIES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REFERENCE_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations(kind: &str, outcome: &str) {
    RECONCILIATIONS_TOTAL
        .with_label_values(&[kind, outcome])
        .inc();
}

pub fn increment_reconciliation_errors(kind: &str, reason: &str) {
    RECONCILIATION_ERRORS_TOTAL
        .with_label_values(&[kind, reason])
        .inc();
}

pub fn observe_reconciliation_duration(kind: &str, duration: f64) {
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration);
}

/// Record one upstream API call
pub fn record_upstream_operation(kind: &str, operation: &str, duration: f64, success: bool) {
    UPSTREAM_OPERATIONS_TOTAL
        .with_label_values(&[kind, operation])
        .inc();
    UPSTREAM_OPERATION_DURATION
        .with_label_values(&[kind, operation])
        .observe(duration);
    if !success {
        UPSTREAM_OPERATION_ERRORS_TOTAL
            .with_label_values(&[kind, operation])
            .inc();
    }
}

pub fn record_cache_lookup(kind: &str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    CACHE_LOOKUPS_TOTAL.with_label_values(&[kind, result]).inc();
}

pub fn increment_rate_limit_retries(kind: &str) {
    RATE_LIMIT_RETRIES_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_reference_failures(kind: &str) {
    REFERENCE_FAILURES_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_requeues(kind: &str) {
    REQUEUES_TOTAL.with_label_values(&[kind]).inc();
}

/// Render every registered metric in the Prometheus text format
pub fn gather_text() -> Result<String> {
    let encoder = prometheus::TextEncoder::new();
    Ok(encoder.encode_to_string(&REGISTRY.gather())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        // Statics are shared across tests; a second registration reports a duplicate
        let _ = register_metrics();
        assert!(register_metrics().is_err());
    }

    #[test]
    fn test_increment_reconciliations() {
        let before = RECONCILIATIONS_TOTAL
            .with_label_values(&["Monitor", "created"])
            .get();
        increment_reconciliations("Monitor", "created");
        let after = RECONCILIATIONS_TOTAL
            .with_label_values(&["Monitor", "created"])
            .get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_record_upstream_operation_counts_errors_only_on_failure() {
        let errors = || {
            UPSTREAM_OPERATION_ERRORS_TOTAL
                .with_label_values(&["Pool", "get"])
                .get()
        };
        let before = errors();
        record_upstream_operation("Pool", "get", 0.2, true);
        assert_eq!(errors(), before);
        record_upstream_operation("Pool", "get", 0.2, false);
        assert_eq!(errors(), before + 1u64);
    }

    #[test]
    fn test_record_cache_lookup_labels_hits_and_misses() {
        let hits = || CACHE_LOOKUPS_TOTAL.with_label_values(&["WorkerScript", "hit"]).get();
        let misses = || CACHE_LOOKUPS_TOTAL.with_label_values(&["WorkerScript", "miss"]).get();
        let (hits_before, misses_before) = (hits(), misses());
        record_cache_lookup("WorkerScript", true);
        record_cache_lookup("WorkerScript", false);
        record_cache_lookup("WorkerScript", false);
        assert_eq!(hits(), hits_before + 1u64);
        assert_eq!(misses(), misses_before + 2u64);
    }

    #[test]
    fn test_observe_reconciliation_duration() {
        observe_reconciliation_duration("LoadBalancer", 1.5);
        // Just verify it doesn't panic - histogram observation doesn't return a value
    }
}
