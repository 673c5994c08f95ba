// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the oidc-gate operator.
//!
//! This module provides metrics collection with the namespace prefix
//! `oidc_gate_io_` (prometheus-safe version of "oidc-gate.io").
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Track reconciliations and their outcomes
//! - **Resource Lifecycle Metrics** - Track dependent resource writes
//! - **Rollout Metrics** - Track workload restarts triggered by config changes
//! - **Error Metrics** - Track error conditions by type
//!
//! # Example
//!
//! ```rust,no_run
//! use oidc_gate::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("Deployment", std::time::Duration::from_secs(1));
//! ```

use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

/// Namespace prefix for all oidc-gate metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "oidc_gate_io";

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via the
/// `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Total number of reconciliations by workload kind and status
///
/// Labels:
/// - `workload_kind`: Kind of workload (`Deployment`, `StatefulSet`)
/// - `status`: Outcome (`success`, `error`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by workload kind and status",
    );
    let counter = CounterVec::new(opts, &["workload_kind", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
///
/// Labels:
/// - `workload_kind`: Kind of workload (`Deployment`, `StatefulSet`)
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by workload kind",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["workload_kind"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of dependent resources created
///
/// Labels:
/// - `resource_kind`: Kind of dependent resource created
pub static RESOURCES_CREATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_resources_created_total"),
        "Total number of dependent resources created by kind",
    );
    let counter = CounterVec::new(opts, &["resource_kind"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of dependent resources updated
///
/// Labels:
/// - `resource_kind`: Kind of dependent resource updated
pub static RESOURCES_UPDATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_resources_updated_total"),
        "Total number of dependent resources updated by kind",
    );
    let counter = CounterVec::new(opts, &["resource_kind"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of workload rollouts triggered by configuration changes
///
/// Labels:
/// - `workload_kind`: Kind of workload restarted (`Deployment`, `StatefulSet`)
pub static ROLLOUTS_TRIGGERED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_rollouts_triggered_total"),
        "Total number of workload rollouts triggered by configuration changes",
    );
    let counter = CounterVec::new(opts, &["workload_kind"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of errors by workload kind and error type
///
/// Labels:
/// - `workload_kind`: Kind of workload where the error occurred
/// - `error_type`: Category of error (e.g., `build_error`, `api_error`)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by workload kind and error type",
    );
    let counter = CounterVec::new(opts, &["workload_kind", "error_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Record a successful reconciliation
///
/// # Arguments
/// * `workload_kind` - The kind of workload reconciled
/// * `duration` - Time taken for the reconciliation
pub fn record_reconciliation_success(workload_kind: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[workload_kind, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[workload_kind])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
///
/// # Arguments
/// * `workload_kind` - The kind of workload reconciled
/// * `duration` - Time taken before the failure
pub fn record_reconciliation_error(workload_kind: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[workload_kind, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[workload_kind])
        .observe(duration.as_secs_f64());
}

/// Record a dependent resource creation
///
/// # Arguments
/// * `resource_kind` - The kind of dependent resource created
pub fn record_resource_created(resource_kind: &str) {
    RESOURCES_CREATED_TOTAL
        .with_label_values(&[resource_kind])
        .inc();
}

/// Record a dependent resource update
///
/// # Arguments
/// * `resource_kind` - The kind of dependent resource updated
pub fn record_resource_updated(resource_kind: &str) {
    RESOURCES_UPDATED_TOTAL
        .with_label_values(&[resource_kind])
        .inc();
}

/// Record a triggered workload rollout
///
/// # Arguments
/// * `workload_kind` - The kind of workload restarted
pub fn record_rollout_triggered(workload_kind: &str) {
    ROLLOUTS_TRIGGERED_TOTAL
        .with_label_values(&[workload_kind])
        .inc();
}

/// Record an error
///
/// # Arguments
/// * `workload_kind` - The kind of workload where the error occurred
/// * `error_type` - Category of error (e.g., `build_error`, `api_error`)
pub fn record_error(workload_kind: &str, error_type: &str) {
    ERRORS_TOTAL
        .with_label_values(&[workload_kind, error_type])
        .inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Returns
/// Prometheus-formatted metrics as a String
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reconciliation_success() {
        let workload_kind = "TestDeployment";
        let duration = Duration::from_millis(500);

        record_reconciliation_success(workload_kind, duration);

        let counter = RECONCILIATION_TOTAL.with_label_values(&[workload_kind, "success"]);
        assert!(counter.get() > 0.0);

        let histogram = RECONCILIATION_DURATION_SECONDS.with_label_values(&[workload_kind]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_record_reconciliation_error() {
        let workload_kind = "TestStatefulSet";
        let duration = Duration::from_millis(250);

        record_reconciliation_error(workload_kind, duration);

        let counter = RECONCILIATION_TOTAL.with_label_values(&[workload_kind, "error"]);
        assert!(counter.get() > 0.0);
    }

    #[test]
    fn test_record_resource_lifecycle() {
        record_resource_created("TestSecret");
        record_resource_updated("TestSecret");

        assert!(RESOURCES_CREATED_TOTAL.with_label_values(&["TestSecret"]).get() > 0.0);
        assert!(RESOURCES_UPDATED_TOTAL.with_label_values(&["TestSecret"]).get() > 0.0);
    }

    #[test]
    fn test_record_rollout_triggered() {
        record_rollout_triggered("TestRollout");
        assert!(ROLLOUTS_TRIGGERED_TOTAL.with_label_values(&["TestRollout"]).get() > 0.0);
    }

    #[test]
    fn test_gather_metrics() {
        record_reconciliation_success("GatherTest", Duration::from_millis(100));

        let result = gather_metrics();
        assert!(result.is_ok(), "Gathering metrics should succeed");

        let metrics_text = result.unwrap();
        assert!(
            metrics_text.contains("oidc_gate_io"),
            "Metrics should contain namespace prefix"
        );
        assert!(
            metrics_text.contains("reconciliations_total"),
            "Metrics should contain reconciliation counter"
        );
    }
}
