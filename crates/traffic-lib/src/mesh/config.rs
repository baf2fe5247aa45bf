//! Istio routing-object generation
//!
//! Pure conversion from a traffic rule to the VirtualService and
//! DestinationRule pair that realizes its split. No I/O happens here; the
//! same rule always produces structurally identical output.

use crate::rule::TrafficRule;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ISTIO_API_VERSION: &str = "networking.istio.io/v1beta1";
pub const ISTIO_GROUP: &str = "networking.istio.io";
pub const ISTIO_VERSION: &str = "v1beta1";
pub const VIRTUAL_SERVICE_KIND: &str = "VirtualService";
pub const DESTINATION_RULE_KIND: &str = "DestinationRule";

/// Metadata carried by every generated mesh object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub namespace: String,
}

/// One weighted routing target inside a VirtualService.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub host: String,
    pub subset: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedRoute {
    pub destination: Destination,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRoute {
    pub route: Vec<WeightedRoute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualServiceSpec {
    pub hosts: Vec<String>,
    pub http: Vec<HttpRoute>,
}

/// Mesh object declaring weighted HTTP routing to named subsets of a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualService {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    pub spec: VirtualServiceSpec,
}

/// A named subset selecting pods by their `version` label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subset {
    pub name: String,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationRuleSpec {
    pub host: String,
    pub subsets: Vec<Subset>,
}

/// Mesh object declaring the named subsets a VirtualService routes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationRule {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    pub spec: DestinationRuleSpec,
}

/// The generated object pair for one service.
///
/// Produced fresh on every reconcile and never mutated afterwards; a later
/// reconcile for the same service supersedes it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingPair {
    pub virtual_service: VirtualService,
    pub destination_rule: DestinationRule,
}

fn subset(version: &str) -> Subset {
    Subset {
        name: version.to_string(),
        labels: BTreeMap::from([("version".to_string(), version.to_string())]),
    }
}

/// Generate the routing objects for a rule.
///
/// The lowercased service name becomes the mesh host and the object-name
/// prefix (`{host}-vs` / `{host}-dr`). Routes keep the declared version
/// order so output stays byte-reproducible. Input invariants (weights
/// summing to 100, distinct non-empty names) are enforced when the rule is
/// constructed and are not re-checked here.
pub fn generate(rule: &TrafficRule, namespace: &str) -> RoutingPair {
    let host = rule.mesh_host();

    let virtual_service = VirtualService {
        api_version: ISTIO_API_VERSION.to_string(),
        kind: VIRTUAL_SERVICE_KIND.to_string(),
        metadata: Metadata {
            name: format!("{host}-vs"),
            namespace: namespace.to_string(),
        },
        spec: VirtualServiceSpec {
            hosts: vec![host.clone()],
            http: vec![HttpRoute {
                route: vec![
                    WeightedRoute {
                        destination: Destination {
                            host: host.clone(),
                            subset: rule.version1_name.clone(),
                        },
                        weight: rule.version1_weight,
                    },
                    WeightedRoute {
                        destination: Destination {
                            host: host.clone(),
                            subset: rule.version2_name.clone(),
                        },
                        weight: rule.version2_weight,
                    },
                ],
            }],
        },
    };

    let destination_rule = DestinationRule {
        api_version: ISTIO_API_VERSION.to_string(),
        kind: DESTINATION_RULE_KIND.to_string(),
        metadata: Metadata {
            name: format!("{host}-dr"),
            namespace: namespace.to_string(),
        },
        spec: DestinationRuleSpec {
            host,
            subsets: vec![subset(&rule.version1_name), subset(&rule.version2_name)],
        },
    };

    RoutingPair {
        virtual_service,
        destination_rule,
    }
}
