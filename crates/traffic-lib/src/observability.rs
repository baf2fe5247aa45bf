//! Observability infrastructure for the traffic manager
//!
//! Provides:
//! - Prometheus metrics (reconcile latency, deploy counters, rule count)
//! - Structured JSON logging for the deploy lifecycle

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for reconcile latency (in seconds). A reconcile spans
/// filesystem writes and cluster round-trips, so buckets run into whole
/// seconds.
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<MetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct MetricsInner {
    reconcile_latency_seconds: Histogram,
    deploys_total: IntCounter,
    snapshot_failures_total: IntCounter,
    cluster_applies_total: IntCounterVec,
    rules: IntGauge,
}

impl MetricsInner {
    fn new() -> Self {
        Self {
            reconcile_latency_seconds: register_histogram!(
                "traffic_manager_reconcile_latency_seconds",
                "Time spent reconciling a rule into mesh configuration",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register reconcile_latency_seconds"),

            deploys_total: register_int_counter!(
                "traffic_manager_deploys_total",
                "Deploy requests that reached the reconciler"
            )
            .expect("Failed to register deploys_total"),

            snapshot_failures_total: register_int_counter!(
                "traffic_manager_snapshot_failures_total",
                "Reconciliations aborted because the snapshot could not be written"
            )
            .expect("Failed to register snapshot_failures_total"),

            cluster_applies_total: register_int_counter_vec!(
                "traffic_manager_cluster_applies_total",
                "Cluster apply attempts by result",
                &["result"]
            )
            .expect("Failed to register cluster_applies_total"),

            rules: register_int_gauge!(
                "traffic_manager_rules",
                "Number of stored traffic rules"
            )
            .expect("Failed to register rules"),
        }
    }
}

/// Metrics handle for Prometheus exposition.
///
/// This is a lightweight handle to the global metrics instance; clones share
/// the same underlying metrics.
#[derive(Clone)]
pub struct Metrics {
    _private: (),
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record how long one reconciliation took.
    pub fn observe_reconcile_latency(&self, duration_secs: f64) {
        self.inner()
            .reconcile_latency_seconds
            .observe(duration_secs);
    }

    /// Count a deploy request entering the reconciler.
    pub fn inc_deploys(&self) {
        self.inner().deploys_total.inc();
    }

    /// Count a reconciliation aborted by a snapshot write failure.
    pub fn inc_snapshot_failures(&self) {
        self.inner().snapshot_failures_total.inc();
    }

    /// Count a cluster apply attempt by result (applied/rejected/unavailable).
    pub fn inc_cluster_apply(&self, result: &str) {
        self.inner()
            .cluster_applies_total
            .with_label_values(&[result])
            .inc();
    }

    /// Update the stored-rule gauge.
    pub fn set_rules(&self, count: i64) {
        self.inner().rules.set(count);
    }
}

/// Structured logger for deploy lifecycle events.
///
/// Keeps significant events in a consistent JSON shape so they can be
/// filtered apart from ordinary request logging.
#[derive(Clone)]
pub struct StructuredLogger {
    namespace: String,
}

impl StructuredLogger {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Log service startup.
    pub fn log_startup(&self, version: &str, cluster_connected: bool) {
        info!(
            event = "manager_started",
            namespace = %self.namespace,
            manager_version = %version,
            cluster_connected = cluster_connected,
            "Traffic manager started"
        );
    }

    /// Log service shutdown.
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "manager_shutdown",
            namespace = %self.namespace,
            reason = %reason,
            "Traffic manager shutting down"
        );
    }

    /// Log the outcome of one deploy.
    pub fn log_deploy(&self, rule_id: &str, service: &str, cluster_applied: bool) {
        info!(
            event = "rule_deployed",
            namespace = %self.namespace,
            rule_id = %rule_id,
            service = %service,
            cluster_applied = cluster_applied,
            "Deployed traffic rule"
        );
    }

    /// Log a deploy that fell back to snapshot-only delivery.
    pub fn log_cluster_degraded(&self, rule_id: &str, service: &str, error: &str) {
        warn!(
            event = "cluster_degraded",
            namespace = %self.namespace,
            rule_id = %rule_id,
            service = %service,
            error = %error,
            "Rule snapshot written but direct cluster apply failed"
        );
    }
}
