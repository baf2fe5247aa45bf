//! Integration tests for the rule API endpoints

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use traffic_lib::health::components;
use traffic_lib::{
    ClusterApplier, HealthRegistry, MemoryStore, Metrics, Reconciler, SnapshotWriter,
    StructuredLogger,
};

// Router wired like main(), but with a temp snapshot directory and no
// cluster client.
async fn setup_test_app(gitops_dir: &Path) -> (Router, Arc<traffic_api::AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::STORE).await;
    health_registry.register(components::GITOPS).await;
    health_registry
        .set_degraded(components::CLUSTER, "cluster unavailable")
        .await;
    health_registry.set_ready(true).await;

    let metrics = Metrics::new();
    let applier = ClusterApplier::new(None, "default", Duration::from_secs(1));
    let reconciler = Reconciler::new(
        "default",
        SnapshotWriter::new(gitops_dir),
        applier,
        metrics.clone(),
    );

    let state = Arc::new(traffic_api::AppState {
        store: Arc::new(MemoryStore::new()),
        reconciler: Arc::new(reconciler),
        health_registry,
        metrics,
        logger: StructuredLogger::new("default"),
    });

    (traffic_api::create_router(state.clone()), state)
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn valid_rule() -> serde_json::Value {
    serde_json::json!({
        "serviceName": "payments",
        "version1Name": "v1",
        "version2Name": "v2",
        "version1Weight": 80,
        "version2Weight": 20,
        "ruleType": "WEIGHTED"
    })
}

#[tokio::test]
async fn create_rule_returns_created_record() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _state) = setup_test_app(dir.path()).await;

    let response = app
        .oneshot(json_request("POST", "/api/rules", valid_rule()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["serviceName"], "payments");
    assert_eq!(body["data"]["version1Weight"], 80);
    assert!(body["data"]["id"].is_string());
    assert!(body["data"]["deployedAt"].is_null());
}

#[tokio::test]
async fn create_rejects_weights_not_summing_to_100() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _state) = setup_test_app(dir.path()).await;

    let mut bad = valid_rule();
    bad["version1Weight"] = serde_json::json!(70);
    let response = app
        .oneshot(json_request("POST", "/api/rules", bad))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("100"));
}

#[tokio::test]
async fn create_rejects_identical_version_names() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _state) = setup_test_app(dir.path()).await;

    let mut bad = valid_rule();
    bad["version2Name"] = serde_json::json!("v1");
    let response = app
        .oneshot(json_request("POST", "/api/rules", bad))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rule_type_defaults_to_weighted() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _state) = setup_test_app(dir.path()).await;

    let mut payload = valid_rule();
    payload.as_object_mut().unwrap().remove("ruleType");
    let response = app
        .oneshot(json_request("POST", "/api/rules", payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["ruleType"], "WEIGHTED");
}

#[tokio::test]
async fn list_returns_created_rules() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _state) = setup_test_app(dir.path()).await;

    app.clone()
        .oneshot(json_request("POST", "/api/rules", valid_rule()))
        .await
        .unwrap();

    let response = app
        .oneshot(empty_request("GET", "/api/rules"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn get_unknown_rule_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _state) = setup_test_app(dir.path()).await;

    let response = app
        .oneshot(empty_request("GET", "/api/rules/missing"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn update_replaces_the_declared_policy() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _state) = setup_test_app(dir.path()).await;

    let created = body_json(
        app.clone()
            .oneshot(json_request("POST", "/api/rules", valid_rule()))
            .await
            .unwrap(),
    )
    .await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let mut next = valid_rule();
    next["version1Weight"] = serde_json::json!(50);
    next["version2Weight"] = serde_json::json!(50);
    let response = app
        .oneshot(json_request("PUT", &format!("/api/rules/{id}"), next))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["version1Weight"], 50);
    assert_eq!(body["data"]["id"], id.as_str());
}

#[tokio::test]
async fn update_unknown_rule_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _state) = setup_test_app(dir.path()).await;

    let response = app
        .oneshot(json_request("PUT", "/api/rules/missing", valid_rule()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_the_rule() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _state) = setup_test_app(dir.path()).await;

    let created = body_json(
        app.clone()
            .oneshot(json_request("POST", "/api/rules", valid_rule()))
            .await
            .unwrap(),
    )
    .await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("/api/rules/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(empty_request("GET", &format!("/api/rules/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deploy_without_cluster_degrades_but_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _state) = setup_test_app(dir.path()).await;

    let created = body_json(
        app.clone()
            .oneshot(json_request("POST", "/api/rules", valid_rule()))
            .await
            .unwrap(),
    )
    .await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(empty_request("POST", &format!("/api/rules/{id}/deploy")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["clusterApplied"], false);
    assert_eq!(body["data"]["clusterError"], "cluster unavailable");
    assert_eq!(
        body["data"]["generated"]["virtualService"]["metadata"]["name"],
        "payments-vs"
    );

    // the snapshot is on disk
    assert!(dir.path().join("payments-virtualservice.yaml").exists());
    assert!(dir.path().join("payments-destinationrule.yaml").exists());

    // the record now carries a deploy stamp
    let fetched = body_json(
        app.oneshot(empty_request("GET", &format!("/api/rules/{id}")))
            .await
            .unwrap(),
    )
    .await;
    assert!(fetched["data"]["deployedAt"].is_string());
}

#[tokio::test]
async fn deploy_unknown_rule_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _state) = setup_test_app(dir.path()).await;

    let response = app
        .oneshot(empty_request("POST", "/api/rules/missing/deploy"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_without_cluster_is_503() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _state) = setup_test_app(dir.path()).await;

    let created = body_json(
        app.clone()
            .oneshot(json_request("POST", "/api/rules", valid_rule()))
            .await
            .unwrap(),
    )
    .await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(empty_request("GET", &format!("/api/rules/{id}/status")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn healthz_reports_degraded_cluster_as_operational() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _state) = setup_test_app(dir.path()).await;

    let response = app
        .oneshot(empty_request("GET", "/healthz"))
        .await
        .unwrap();

    // degraded still returns 200 (operational)
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(
        body["components"]["cluster"]["message"],
        "cluster unavailable"
    );
}

#[tokio::test]
async fn readyz_follows_the_ready_flag() {
    let dir = tempfile::tempdir().unwrap();
    let (app, state) = setup_test_app(dir.path()).await;

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/readyz"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    state.health_registry.set_ready(false).await;
    let response = app
        .oneshot(empty_request("GET", "/readyz"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn metrics_expose_deploy_counters() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _state) = setup_test_app(dir.path()).await;

    let created = body_json(
        app.clone()
            .oneshot(json_request("POST", "/api/rules", valid_rule()))
            .await
            .unwrap(),
    )
    .await;
    let id = created["data"]["id"].as_str().unwrap().to_string();
    app.clone()
        .oneshot(empty_request("POST", &format!("/api/rules/{id}/deploy")))
        .await
        .unwrap();

    let response = app
        .oneshot(empty_request("GET", "/metrics"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("traffic_manager_deploys_total"));
    assert!(text.contains("traffic_manager_cluster_applies_total"));
    assert!(text.contains("traffic_manager_reconcile_latency_seconds"));
}
