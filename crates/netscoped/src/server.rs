//! HTTP server for netscoped.

use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::info;

use netscope_common::NetscopeConfig;

use crate::routes;
use crate::session::SessionStore;
use crate::workflow::TroubleshootingWorkflow;

/// Application state shared across handlers.
pub struct AppState {
    pub sessions: SessionStore,
    pub workflow: TroubleshootingWorkflow,
    pub config: NetscopeConfig,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(workflow: TroubleshootingWorkflow, config: NetscopeConfig) -> Self {
        Self { sessions: SessionStore::new(), workflow, config, start_time: Instant::now() }
    }
}

/// Build the router; split out so tests can drive it without a listener.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::troubleshoot_routes())
        .merge(routes::health_routes())
        .merge(routes::session_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server.
pub async fn run(state: AppState) -> Result<()> {
    let bind = state.config.server.bind.clone();
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("  Listening on http://{}", bind);

    axum::serve(listener, app).await?;
    Ok(())
}
