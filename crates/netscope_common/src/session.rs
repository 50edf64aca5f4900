//! Session-level types: workflow states, conversation turns, and the
//! evidence trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// States of the troubleshooting state machine.
///
/// SCOPING, ROOT_CAUSED, APPLYING and VERIFYING are transient within a single
/// turn; a session at rest between turns is DIAGNOSING, AWAITING_CONFIRMATION,
/// DONE or ABORTED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    Scoping,
    Diagnosing,
    RootCaused,
    AwaitingConfirmation,
    Applying,
    Verifying,
    Done,
    Aborted,
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Done | WorkflowState::Aborted)
    }
}

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
    Tool,
}

/// One entry in the ordered conversation history fed to the oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self { role, content: content.into(), timestamp: Utc::now() }
    }
}

/// What kind of evidence an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    ScopeDiscovery,
    Topology,
    Reachability,
    FlowLogs,
    Proposal,
    Mutation,
    Verification,
    Note,
}

/// One entry of the evidence trail returned with every response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: EvidenceKind,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl EvidenceEntry {
    pub fn new(kind: EvidenceKind, summary: impl Into<String>) -> Self {
        Self { timestamp: Utc::now(), kind, summary: summary.into(), detail: None }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}
