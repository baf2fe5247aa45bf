//! HTTP API: rule CRUD, the deploy action, health checks and metrics

use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use traffic_lib::health::{components, ComponentStatus, HealthRegistry};
use traffic_lib::{
    ClusterError, Metrics, Reconciler, RuleError, RuleSpec, RuleStore, SnapshotError, StoreError,
    StructuredLogger, TrafficRule,
};
use tracing::{error, info};
use uuid::Uuid;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RuleStore>,
    pub reconciler: Arc<Reconciler>,
    pub health_registry: HealthRegistry,
    pub metrics: Metrics,
    pub logger: StructuredLogger,
}

/// Error surface of the rule API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("rule {0} not found")]
    NotFound(String),
    #[error("invalid rule: {0}")]
    InvalidRule(#[from] RuleError),
    #[error("deployment failed: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("cluster unavailable")]
    ClusterUnavailable,
    #[error("cluster request failed: {0}")]
    Cluster(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::NotFound(id),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRule(_) => StatusCode::BAD_REQUEST,
            ApiError::Snapshot(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ClusterUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Cluster(_) => StatusCode::BAD_GATEWAY,
        };
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Uniform success envelope
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    data: T,
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: None,
        data,
    })
}

fn ok_with_message<T: Serialize>(message: &str, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: Some(message.to_string()),
        data,
    })
}

/// Health check - 200 while at least degraded, 503 once unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check - 200 if ready, 503 if not
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %err, "failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// GET /api/rules - all rules, newest first
async fn list_rules(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rules = state.store.list().await;
    state.metrics.set_rules(rules.len() as i64);
    ok(rules)
}

/// POST /api/rules - validate and create a rule
async fn create_rule(
    State(state): State<Arc<AppState>>,
    Json(spec): Json<RuleSpec>,
) -> Result<impl IntoResponse, ApiError> {
    let rule = TrafficRule::new(Uuid::new_v4().to_string(), spec)?;
    state.store.insert(rule.clone()).await;
    state.metrics.set_rules(state.store.count().await as i64);

    info!(rule_id = %rule.id, service = %rule.service_name, "created traffic rule");
    Ok((StatusCode::CREATED, ok(rule)))
}

/// GET /api/rules/{id}
async fn get_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let rule = state
        .store
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(id))?;
    Ok(ok(rule))
}

/// PUT /api/rules/{id} - replace the declared policy
async fn update_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(spec): Json<RuleSpec>,
) -> Result<impl IntoResponse, ApiError> {
    let existing = state
        .store
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(id.clone()))?;

    let updated = existing.update_spec(spec)?;
    state.store.replace(updated.clone()).await?;

    info!(rule_id = %id, service = %updated.service_name, "updated traffic rule");
    Ok(ok(updated))
}

/// DELETE /api/rules/{id}
///
/// Removes the record only; previously applied mesh objects stay in the
/// cluster and the snapshot directory until superseded.
async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.delete(&id).await?;
    state.metrics.set_rules(state.store.count().await as i64);

    info!(rule_id = %id, "deleted traffic rule");
    Ok(ok_with_message("Rule deleted successfully", id))
}

/// POST /api/rules/{id}/deploy - reconcile the rule into the mesh
///
/// A written snapshot is the bar for success: the rule is stamped as
/// deployed even when the live cluster is unreachable, and the degraded
/// apply result is surfaced in the response body.
async fn deploy_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let rule = state
        .store
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(id.clone()))?;

    info!(rule_id = %id, service = %rule.service_name, "deploying traffic rule");

    let outcome = match state.reconciler.reconcile(&rule).await {
        Ok(outcome) => outcome,
        Err(err) => {
            state
                .health_registry
                .set_unhealthy(components::GITOPS, err.to_string())
                .await;
            return Err(err.into());
        }
    };
    state.health_registry.set_healthy(components::GITOPS).await;

    match &outcome.cluster_error {
        None => {
            state.health_registry.set_healthy(components::CLUSTER).await;
        }
        Some(error) => {
            state
                .health_registry
                .set_degraded(components::CLUSTER, error.clone())
                .await;
            state
                .logger
                .log_cluster_degraded(&id, &rule.service_name, error);
        }
    }

    state.store.set_deployed_at(&id, Utc::now()).await?;
    state
        .logger
        .log_deploy(&id, &rule.service_name, outcome.cluster_applied);

    Ok(ok_with_message("Traffic rule deployed successfully", outcome))
}

/// GET /api/rules/{id}/status - live state of the routed Service
async fn rule_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let rule = state
        .store
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(id))?;

    match state.reconciler.service_status(&rule.mesh_host()).await {
        Ok(status) => Ok(ok(status)),
        Err(ClusterError::Unavailable) => Err(ApiError::ClusterUnavailable),
        Err(err @ ClusterError::Rejected { .. }) => Err(ApiError::Cluster(err.to_string())),
    }
}

async fn log_request(request: Request, next: Next) -> Response {
    info!(method = %request.method(), path = %request.uri().path(), "request");
    next.run(request).await
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/rules", get(list_rules).post(create_rule))
        .route(
            "/api/rules/:id",
            get(get_rule).put(update_rule).delete(delete_rule),
        )
        .route("/api/rules/:id/deploy", post(deploy_rule))
        .route("/api/rules/:id/status", get(rule_status))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
