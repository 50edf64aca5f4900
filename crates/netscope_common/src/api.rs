//! HTTP API request/response types shared by the daemon and the CLI.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::{EvidenceEntry, WorkflowState};

/// Request to the troubleshooting endpoint. `prompt` is required in practice;
/// it is optional here so the handler can answer 400 instead of a
/// deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TroubleshootRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    /// Root project for scope discovery. Falls back to the configured
    /// default when absent.
    #[serde(default)]
    pub project_id: Option<String>,
    /// Continue an existing conversation (required for confirmations).
    #[serde(default)]
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TroubleshootResponse {
    pub session_id: Uuid,
    pub state: WorkflowState,
    pub response: String,
    pub evidence_trail: Vec<EvidenceEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub active_sessions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub state: WorkflowState,
    pub turns: usize,
    pub evidence_trail: Vec<EvidenceEntry>,
}
