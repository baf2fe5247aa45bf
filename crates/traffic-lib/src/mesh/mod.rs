//! Mesh reconciliation pipeline
//!
//! Turns a stored traffic rule into Istio routing objects, persists them to
//! the GitOps snapshot directory, then best-effort applies them to the live
//! cluster. A snapshot failure aborts the pipeline; a cluster failure only
//! degrades the outcome.

pub mod apply;
pub mod config;
pub mod snapshot;

pub use apply::{ApplyOutcome, ClusterApplier, ClusterError, ServiceStatus};
pub use config::{generate, RoutingPair};
pub use snapshot::{SnapshotError, SnapshotWriter};

use crate::observability::Metrics;
use crate::rule::TrafficRule;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Result of one reconciliation, returned to the caller.
///
/// `cluster_applied` is true only when both objects were created or replaced
/// against the live cluster. A written snapshot with a degraded cluster is
/// still a successful reconciliation; the caller decides whether to stamp
/// the rule as deployed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentOutcome {
    pub generated: RoutingPair,
    pub snapshot_path: PathBuf,
    pub cluster_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_error: Option<String>,
}

/// Orchestrates generate -> snapshot -> apply for one rule at a time.
///
/// Every step runs to completion before the next; there are no retries and
/// no cancellation inside a single call. Reconciles for different services
/// are independent; racing reconciles for the same service resolve to
/// whichever applies last.
pub struct Reconciler {
    namespace: String,
    snapshots: SnapshotWriter,
    applier: ClusterApplier,
    metrics: Metrics,
}

impl Reconciler {
    pub fn new(
        namespace: impl Into<String>,
        snapshots: SnapshotWriter,
        applier: ClusterApplier,
        metrics: Metrics,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            snapshots,
            applier,
            metrics,
        }
    }

    pub fn snapshot_dir(&self) -> &std::path::Path {
        self.snapshots.dir()
    }

    pub fn has_cluster(&self) -> bool {
        self.applier.has_cluster()
    }

    /// Live Service lookup for the rule's backing service.
    pub async fn service_status(&self, host: &str) -> Result<ServiceStatus, ClusterError> {
        self.applier.service_status(host).await
    }

    /// Run the pipeline for one rule.
    ///
    /// Fails only when the snapshot cannot be written; cluster problems are
    /// folded into the returned outcome.
    pub async fn reconcile(&self, rule: &TrafficRule) -> Result<DeploymentOutcome, SnapshotError> {
        let started = Instant::now();
        self.metrics.inc_deploys();

        let pair = generate(rule, &self.namespace);
        info!(
            service = %rule.service_name,
            virtual_service = %pair.virtual_service.metadata.name,
            destination_rule = %pair.destination_rule.metadata.name,
            "generated routing objects"
        );

        let snapshot_path = match self.snapshots.write(&pair, &rule.mesh_host()).await {
            Ok(path) => path,
            Err(err) => {
                self.metrics.inc_snapshot_failures();
                return Err(err);
            }
        };

        let outcome = self.applier.apply(&pair).await;
        self.metrics.inc_cluster_apply(outcome.result_label());
        self.metrics
            .observe_reconcile_latency(started.elapsed().as_secs_f64());

        Ok(DeploymentOutcome {
            generated: pair,
            snapshot_path,
            cluster_applied: outcome.applied,
            cluster_error: outcome.error.map(|err| err.to_string()),
        })
    }
}
