//! Cluster application of generated routing objects
//!
//! Direct application is a best-effort fast path: the GitOps snapshot is the
//! authoritative delivery channel, so a missing or unreachable cluster
//! degrades the outcome instead of failing the reconciliation. Each object
//! is applied with create-or-replace semantics (create, and on a conflict
//! replace the live object).

use super::config::{RoutingPair, DESTINATION_RULE_KIND, ISTIO_GROUP, ISTIO_VERSION, VIRTUAL_SERVICE_KIND};
use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind, PostParams};
use kube::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// A cluster-facing failure. Neither variant aborts reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    /// No client configured, the connection failed, or the request timed out.
    #[error("cluster unavailable")]
    Unavailable,
    /// The API server accepted the connection but rejected the object.
    #[error("{kind} {name} rejected by cluster: {message}")]
    Rejected {
        kind: String,
        name: String,
        message: String,
    },
}

/// Aggregate outcome of applying a routing pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub applied: bool,
    pub error: Option<ClusterError>,
}

impl ApplyOutcome {
    fn applied() -> Self {
        Self {
            applied: true,
            error: None,
        }
    }

    fn degraded(error: ClusterError) -> Self {
        Self {
            applied: false,
            error: Some(error),
        }
    }

    /// Metric label for this outcome.
    pub fn result_label(&self) -> &'static str {
        match &self.error {
            None => "applied",
            Some(ClusterError::Unavailable) => "unavailable",
            Some(ClusterError::Rejected { .. }) => "rejected",
        }
    }
}

/// Live state of a routed Kubernetes Service, for operator visibility.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub name: String,
    pub namespace: String,
    pub cluster_ip: Option<String>,
    pub ports: Vec<i32>,
}

/// Applies generated routing objects to the live cluster.
///
/// The client is optional by design. When the process starts without a
/// reachable cluster configuration every apply short-circuits to a degraded
/// outcome and the snapshot remains the only delivery path.
pub struct ClusterApplier {
    client: Option<Client>,
    namespace: String,
    request_timeout: Duration,
}

impl ClusterApplier {
    pub fn new(
        client: Option<Client>,
        namespace: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            request_timeout,
        }
    }

    pub fn has_cluster(&self) -> bool {
        self.client.is_some()
    }

    /// Apply both objects of the pair with create-or-replace semantics.
    ///
    /// Stops at the first failing object; the snapshot already holds the
    /// full pair, so a partial direct apply is corrected by the next GitOps
    /// sync.
    pub async fn apply(&self, pair: &RoutingPair) -> ApplyOutcome {
        let Some(client) = self.client.clone() else {
            debug!("no cluster configured, skipping direct apply");
            return ApplyOutcome::degraded(ClusterError::Unavailable);
        };

        let objects = [
            (
                VIRTUAL_SERVICE_KIND,
                pair.virtual_service.metadata.name.clone(),
                serde_json::to_value(&pair.virtual_service.spec),
            ),
            (
                DESTINATION_RULE_KIND,
                pair.destination_rule.metadata.name.clone(),
                serde_json::to_value(&pair.destination_rule.spec),
            ),
        ];

        for (kind, name, spec) in objects {
            let spec = match spec {
                Ok(spec) => spec,
                Err(err) => {
                    return ApplyOutcome::degraded(ClusterError::Rejected {
                        kind: kind.to_string(),
                        name,
                        message: format!("object could not be serialized: {err}"),
                    });
                }
            };
            if let Err(error) = self.apply_object(client.clone(), kind, &name, spec).await {
                warn!(kind, name = %name, error = %error, "cluster apply degraded");
                return ApplyOutcome::degraded(error);
            }
        }

        ApplyOutcome::applied()
    }

    async fn apply_object(
        &self,
        client: Client,
        kind: &str,
        name: &str,
        spec: serde_json::Value,
    ) -> Result<(), ClusterError> {
        let gvk = GroupVersionKind::gvk(ISTIO_GROUP, ISTIO_VERSION, kind);
        let resource = ApiResource::from_gvk(&gvk);
        let api: Api<DynamicObject> = Api::namespaced_with(client, &self.namespace, &resource);

        let mut object = DynamicObject::new(name, &resource);
        object.metadata.namespace = Some(self.namespace.clone());
        object.data = serde_json::json!({ "spec": spec });

        let params = PostParams::default();
        let created = tokio::time::timeout(self.request_timeout, api.create(&params, &object))
            .await
            .map_err(|_| ClusterError::Unavailable)?;

        match created {
            Ok(_) => {
                info!(kind, name, namespace = %self.namespace, "created routing object");
                Ok(())
            }
            Err(kube::Error::Api(response)) if response.code == 409 => {
                // already present: fetch the live resourceVersion and replace
                let replace = async {
                    let existing = api.get(name).await?;
                    let mut replacement = object.clone();
                    replacement.metadata.resource_version = existing.metadata.resource_version;
                    api.replace(name, &params, &replacement).await
                };
                tokio::time::timeout(self.request_timeout, replace)
                    .await
                    .map_err(|_| ClusterError::Unavailable)?
                    .map_err(|err| classify(kind, name, err))?;
                info!(kind, name, namespace = %self.namespace, "replaced routing object");
                Ok(())
            }
            Err(err) => Err(classify(kind, name, err)),
        }
    }

    /// Read the live Kubernetes Service behind a rule, when a cluster is
    /// reachable.
    pub async fn service_status(&self, service: &str) -> Result<ServiceStatus, ClusterError> {
        let Some(client) = self.client.clone() else {
            return Err(ClusterError::Unavailable);
        };

        let api: Api<Service> = Api::namespaced(client, &self.namespace);
        let found = tokio::time::timeout(self.request_timeout, api.get(service))
            .await
            .map_err(|_| ClusterError::Unavailable)?
            .map_err(|err| classify("Service", service, err))?;

        let spec = found.spec.unwrap_or_default();
        Ok(ServiceStatus {
            name: service.to_string(),
            namespace: self.namespace.clone(),
            cluster_ip: spec.cluster_ip,
            ports: spec
                .ports
                .unwrap_or_default()
                .into_iter()
                .map(|port| port.port)
                .collect(),
        })
    }
}

/// Map a kube error onto the cluster error taxonomy: API-level responses
/// are rejections, everything else (transport, auth setup, timeouts) means
/// the cluster is effectively unavailable.
fn classify(kind: &str, name: &str, err: kube::Error) -> ClusterError {
    match err {
        kube::Error::Api(response) => ClusterError::Rejected {
            kind: kind.to_string(),
            name: name.to_string(),
            message: response.message,
        },
        _ => ClusterError::Unavailable,
    }
}
