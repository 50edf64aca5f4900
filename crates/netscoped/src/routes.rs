//! API routes for netscoped.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use netscope_common::{
    HealthResponse, SessionResponse, TroubleshootRequest, TroubleshootResponse, VERSION,
};

use crate::server::AppState;

type AppStateArc = Arc<AppState>;

pub fn troubleshoot_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/troubleshoot", post(troubleshoot))
}

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(health_check))
}

pub fn session_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/session/:id", get(get_session))
}

/// One conversation turn: create or continue a session, run the workflow,
/// return the response plus the full evidence trail.
async fn troubleshoot(
    State(state): State<AppStateArc>,
    Json(req): Json<TroubleshootRequest>,
) -> Result<Json<TroubleshootResponse>, (StatusCode, String)> {
    let prompt = match req.prompt.as_deref().map(str::trim) {
        Some(prompt) if !prompt.is_empty() => prompt.to_string(),
        _ => return Err((StatusCode::BAD_REQUEST, "missing `prompt`".to_string())),
    };

    let session_handle = match req.session_id {
        Some(id) => state.sessions.get(&id).await.ok_or_else(|| {
            (StatusCode::NOT_FOUND, format!("unknown session `{}`", id))
        })?,
        None => {
            let project = state
                .config
                .resolve_project(req.project_id.as_deref())
                .ok_or_else(|| {
                    (
                        StatusCode::BAD_REQUEST,
                        "missing `project_id` and no default project is configured".to_string(),
                    )
                })?;
            if !state.workflow.oracle_available().await {
                return Err((
                    StatusCode::SERVICE_UNAVAILABLE,
                    "reasoning backend is not available".to_string(),
                ));
            }
            let (id, handle) = state.sessions.create(vec![project]).await;
            info!("  New session {}", id);
            handle
        }
    };

    // Holding the lock for the whole turn serializes turns per session.
    let mut session = session_handle.lock().await;
    info!("[Q]  Session {} ({:?}): {}", session.id, session.state, prompt);

    match state.workflow.handle_turn(&mut session, &prompt).await {
        Ok(response) => {
            info!("[A]  Session {} now {:?}", session.id, session.state);
            Ok(Json(TroubleshootResponse {
                session_id: session.id,
                state: session.state,
                response,
                evidence_trail: session.evidence.clone(),
            }))
        }
        Err(e) => {
            error!("[E]  Session {} failed: {}", session.id, e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        active_sessions: state.sessions.count().await,
    })
}

async fn get_session(
    State(state): State<AppStateArc>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, (StatusCode, String)> {
    let handle = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("unknown session `{}`", id)))?;

    let session = handle.lock().await;
    Ok(Json(SessionResponse {
        session_id: session.id,
        state: session.state,
        turns: session.turns.len(),
        evidence_trail: session.evidence.clone(),
    }))
}
