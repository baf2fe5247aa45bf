//! Traffic API - declarative traffic-split management service
//!
//! Serves the rule CRUD API and reconciles deployed rules into Istio
//! routing objects, with GitOps snapshots as the durable delivery path.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use traffic_api::{api, config};
use traffic_lib::health::components;
use traffic_lib::{
    ClusterApplier, HealthRegistry, MemoryStore, Metrics, Reconciler, SnapshotWriter,
    StructuredLogger,
};

const MANAGER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting traffic-api");

    // Load configuration
    let config = config::ServerConfig::load()?;
    info!(
        namespace = %config.mesh_namespace,
        gitops_dir = %config.gitops_dir,
        "Manager configured"
    );

    // Cluster access is optional: without a kubeconfig or in-cluster
    // environment the manager still serves rules and writes snapshots.
    let kube_client = match kube::Client::try_default().await {
        Ok(client) => Some(client),
        Err(err) => {
            warn!(error = %err, "Could not load Kubernetes config, direct apply disabled");
            None
        }
    };
    let cluster_connected = kube_client.is_some();

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::STORE).await;
    health_registry.register(components::GITOPS).await;
    if cluster_connected {
        health_registry.register(components::CLUSTER).await;
    } else {
        health_registry
            .set_degraded(components::CLUSTER, "cluster unavailable")
            .await;
    }

    // Initialize metrics and the structured logger
    let metrics = Metrics::new();
    let logger = StructuredLogger::new(config.mesh_namespace.clone());
    logger.log_startup(MANAGER_VERSION, cluster_connected);

    let applier = ClusterApplier::new(
        kube_client,
        config.mesh_namespace.clone(),
        Duration::from_secs(config.cluster_timeout_secs),
    );
    let reconciler = Reconciler::new(
        config.mesh_namespace.clone(),
        SnapshotWriter::new(&config.gitops_dir),
        applier,
        metrics.clone(),
    );

    // Create shared application state
    let app_state = Arc::new(api::AppState {
        store: Arc::new(MemoryStore::new()),
        reconciler: Arc::new(reconciler),
        health_registry: health_registry.clone(),
        metrics,
        logger: logger.clone(),
    });

    // Mark the manager as ready after initialization
    health_registry.set_ready(true).await;

    // Start the API server
    let _api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}
