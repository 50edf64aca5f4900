//! HTTP surface tests: request validation, health, and session lookup.

mod common;

use common::HarnessBuilder;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

use netscope_common::{NetscopeConfig, TroubleshootResponse, WorkflowState};
use netscoped::oracle::{FakeOracle, OracleDecision};
use netscoped::server::{router, AppState};

fn app(default_project: Option<&str>) -> axum::Router {
    let harness = HarnessBuilder::new(FakeOracle::scripted(vec![OracleDecision::Answer {
        text: "everything is reachable".to_string(),
    }]))
    .build();

    let mut config = NetscopeConfig::default();
    config.cloud.default_project = default_project.map(|p| p.to_string());

    router(Arc::new(AppState::new(harness.workflow, config)))
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn missing_prompt_is_a_400() {
    let response = app(Some("proj-a"))
        .oneshot(post_json("/v1/troubleshoot", serde_json::json!({"project_id": "proj-a"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app(Some("proj-a"))
        .oneshot(post_json(
            "/v1/troubleshoot",
            serde_json::json!({"prompt": "   ", "project_id": "proj-a"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unresolvable_project_is_a_400() {
    let response = app(None)
        .oneshot(post_json("/v1/troubleshoot", serde_json::json!({"prompt": "help"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn configured_default_project_fills_in() {
    let response = app(Some("proj-default"))
        .oneshot(post_json("/v1/troubleshoot", serde_json::json!({"prompt": "is 443 open?"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: TroubleshootResponse =
        serde_json::from_value(response_json(response).await).unwrap();
    assert_eq!(body.state, WorkflowState::Done);
    assert!(body.response.contains("reachable"));
    assert!(!body.evidence_trail.is_empty());
}

#[tokio::test]
async fn unknown_session_is_a_404() {
    let response = app(Some("proj-a"))
        .oneshot(post_json(
            "/v1/troubleshoot",
            serde_json::json!({
                "prompt": "continue",
                "session_id": "00000000-0000-0000-0000-000000000000"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app(Some("proj-a"))
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/v1/session/00000000-0000-0000-0000-000000000000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unavailable_oracle_is_a_503() {
    let harness = HarnessBuilder::new(FakeOracle::unavailable()).build();
    let mut config = NetscopeConfig::default();
    config.cloud.default_project = Some("proj-a".to_string());
    let app = router(Arc::new(AppState::new(harness.workflow, config)));

    let response = app
        .oneshot(post_json("/v1/troubleshoot", serde_json::json!({"prompt": "help"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn health_reports_version_and_sessions() {
    let response = app(Some("proj-a"))
        .oneshot(Request::builder().uri("/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["active_sessions"], 0);
    assert!(body["version"].as_str().is_some());
}
