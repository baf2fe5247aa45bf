//! Core library for the traffic split manager
//!
//! This crate provides the functionality behind the rule API:
//! - Traffic rule records and invariant-checked validation
//! - Istio routing-object generation
//! - GitOps snapshot persistence
//! - Best-effort cluster application
//! - Rule storage, health checks and metrics

pub mod health;
pub mod mesh;
pub mod observability;
pub mod rule;
pub mod store;

pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use mesh::{
    ClusterApplier, ClusterError, DeploymentOutcome, Reconciler, RoutingPair, ServiceStatus,
    SnapshotError, SnapshotWriter,
};
pub use observability::{Metrics, StructuredLogger};
pub use rule::{RuleError, RuleSpec, RuleType, TrafficRule};
pub use store::{MemoryStore, RuleStore, StoreError};
