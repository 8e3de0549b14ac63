//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `application_sync_passes_total` - Total number of reconciliation passes
//! - `application_sync_pass_errors_total` - Total number of passes that failed fatally
//! - `application_sync_pass_duration_seconds` - Duration of reconciliation passes
//! - `application_sync_applications_total` - Applications processed, by `operation` and `outcome`
//! - `application_sync_applications_managed` - Managed applications seen in the last pass
//! - `application_sync_store_operations_total` - Store calls, by `store`, `operation` and `outcome`
//! - `application_sync_store_operation_duration_seconds` - Duration of store calls, by `store`

use anyhow::Result;
use prometheus::{Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static PASSES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "application_sync_passes_total",
        "Total number of reconciliation passes",
    )
    .expect("Failed to create PASSES_TOTAL metric - this should never happen")
});

static PASS_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "application_sync_pass_errors_total",
        "Total number of reconciliation passes that failed before processing applications",
    )
    .expect("Failed to create PASS_ERRORS_TOTAL metric - this should never happen")
});

static PASS_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "application_sync_pass_duration_seconds",
            "Duration of reconciliation passes in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
    )
    .expect("Failed to create PASS_DURATION metric - this should never happen")
});

static APPLICATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "application_sync_applications_total",
            "Total number of applications processed by operation and outcome",
        ),
        &["operation", "outcome"],
    )
    .expect("Failed to create APPLICATIONS_TOTAL metric - this should never happen")
});

static APPLICATIONS_MANAGED: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "application_sync_applications_managed",
        "Number of managed applications found in the runtime during the last pass",
    )
    .expect("Failed to create APPLICATIONS_MANAGED metric - this should never happen")
});

static STORE_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "application_sync_store_operations_total",
            "Total number of store operations by store, operation and outcome",
        ),
        &["store", "operation", "outcome"],
    )
    .expect("Failed to create STORE_OPERATIONS_TOTAL metric - this should never happen")
});

static STORE_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "application_sync_store_operation_duration_seconds",
            "Duration of store operations in seconds by store",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
        &["store"],
    )
    .expect("Failed to create STORE_OPERATION_DURATION metric - this should never happen")
});

/// Register all metrics with the registry
///
/// # Errors
///
/// Returns an error if a metric is already registered.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(PASSES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PASS_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PASS_DURATION.clone()))?;
    REGISTRY.register(Box::new(APPLICATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(APPLICATIONS_MANAGED.clone()))?;
    REGISTRY.register(Box::new(STORE_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STORE_OPERATION_DURATION.clone()))?;

    Ok(())
}

pub fn increment_passes() {
    PASSES_TOTAL.inc();
}

pub fn increment_pass_errors() {
    PASS_ERRORS_TOTAL.inc();
}

pub fn observe_pass_duration(duration: f64) {
    PASS_DURATION.observe(duration);
}

pub fn record_application_outcome(operation: &str, success: bool) {
    let outcome = if success { "success" } else { "error" };
    APPLICATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

pub fn set_applications_managed(count: usize) {
    APPLICATIONS_MANAGED.set(i64::try_from(count).unwrap_or(i64::MAX));
}

/// Record one store call
///
/// `NotFound` results are counted as `not_found`, not as errors.
pub fn record_store_operation(store: &str, operation: &str, outcome: &str, duration: f64) {
    STORE_OPERATIONS_TOTAL
        .with_label_values(&[store, operation, outcome])
        .inc();
    STORE_OPERATION_DURATION
        .with_label_values(&[store])
        .observe(duration);
}

/// Text exposition of every registered metric
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn gather_text() -> Result<String> {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        // Registration may already have happened in another test
        let _ = register_metrics();
        assert!(register_metrics().is_err());
    }

    #[test]
    fn test_increment_passes() {
        let before = PASSES_TOTAL.get();
        increment_passes();
        assert_eq!(PASSES_TOTAL.get(), before + 1u64);
    }

    #[test]
    fn test_record_application_outcome() {
        let before = APPLICATIONS_TOTAL
            .with_label_values(&["create", "error"])
            .get();
        record_application_outcome("create", false);
        let after = APPLICATIONS_TOTAL
            .with_label_values(&["create", "error"])
            .get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_record_store_operation() {
        let before = STORE_OPERATIONS_TOTAL
            .with_label_values(&["secret", "delete", "not_found"])
            .get();
        record_store_operation("secret", "delete", "not_found", 0.01);
        let after = STORE_OPERATIONS_TOTAL
            .with_label_values(&["secret", "delete", "not_found"])
            .get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_gather_text_contains_registered_metrics() {
        let _ = register_metrics();
        increment_passes();
        let text = gather_text().unwrap();
        assert!(text.contains("application_sync_passes_total"));
    }
}
