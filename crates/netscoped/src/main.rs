//! Netscope daemon - cloud network troubleshooting assistant.
//!
//! Discovers the project scope around a connectivity problem, gathers
//! reachability and flow-log evidence under the direction of a reasoning
//! model, and applies a confirmed firewall remediation, then re-verifies.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use netscope_common::NetscopeConfig;
use netscoped::cloud::{RestFirewall, RestFlowLogStore, RestInventory, RestReachability};
use netscoped::oracle::{OracleClient, ReasoningOracle};
use netscoped::server::{self, AppState};
use netscoped::workflow::TroubleshootingWorkflow;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Netscope daemon v{} starting", env!("CARGO_PKG_VERSION"));

    let config = NetscopeConfig::load()?;
    let token = std::env::var(&config.cloud.access_token_env).ok();
    if token.is_none() {
        warn!(
            "No API token in ${}; cloud calls will be unauthenticated",
            config.cloud.access_token_env
        );
    }

    let oracle = Arc::new(OracleClient::new(
        &config.oracle.endpoint,
        &config.oracle.model,
        config.oracle.timeout_secs,
    ));
    if !oracle.is_available().await {
        warn!("Oracle endpoint {} is not answering; requests will fail until it does", config.oracle.endpoint);
    }

    let workflow = TroubleshootingWorkflow::new(
        oracle,
        Arc::new(RestInventory::new(&config.cloud.compute_endpoint, token.clone())),
        Arc::new(RestReachability::new(&config.cloud.network_management_endpoint, token.clone())),
        Arc::new(RestFlowLogStore::new(&config.cloud.logging_endpoint, token.clone())),
        Arc::new(RestFirewall::new(&config.cloud.compute_endpoint, token)),
        config.cloud.project_deny_list.clone(),
    );

    server::run(AppState::new(workflow, config)).await
}
