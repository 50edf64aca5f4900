//! Workflow sessions.
//!
//! One session per user conversation. A session owns its discovered scope,
//! its staged mutation and its evidence trail exclusively; nothing is shared
//! across sessions. Turns within a session are serialized by holding the
//! session lock for the duration of a turn.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use netscope_common::{
    DiscoveredScope, EvidenceEntry, EvidenceKind, FirewallAction, ProjectRef,
    ReachabilityResult, Turn, TurnRole, WorkflowState,
};

use crate::cloud::ReachabilitySpec;

/// A staged remediation awaiting confirmation. At most one per session.
#[derive(Debug, Clone)]
pub struct PendingMutation {
    pub cause: String,
    pub action: FirewallAction,
}

pub struct WorkflowSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub state: WorkflowState,
    /// Root projects declared for this conversation.
    pub roots: Vec<ProjectRef>,
    pub turns: Vec<Turn>,
    pub scope: DiscoveredScope,
    pub last_reachability: Option<ReachabilityResult>,
    /// Parameters of the most recent probe; VERIFYING re-runs these.
    pub last_probe_spec: Option<ReachabilitySpec>,
    pub pending_mutation: Option<PendingMutation>,
    pub evidence: Vec<EvidenceEntry>,
}

impl WorkflowSession {
    pub fn new(roots: Vec<ProjectRef>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            state: WorkflowState::Scoping,
            roots,
            turns: Vec::new(),
            scope: DiscoveredScope::new(),
            last_reachability: None,
            last_probe_spec: None,
            pending_mutation: None,
            evidence: Vec::new(),
        }
    }

    pub fn push_turn(&mut self, role: TurnRole, content: impl Into<String>) {
        self.turns.push(Turn::new(role, content));
    }

    pub fn add_evidence(&mut self, kind: EvidenceKind, summary: impl Into<String>) {
        self.evidence.push(EvidenceEntry::new(kind, summary));
    }

    pub fn add_evidence_with_detail(
        &mut self,
        kind: EvidenceKind,
        summary: impl Into<String>,
        detail: serde_json::Value,
    ) {
        self.evidence.push(EvidenceEntry::new(kind, summary).with_detail(detail));
    }
}

/// In-memory session registry. Sessions live for the conversation and are
/// dropped with the process; there is no persistence guarantee.
#[derive(Default)]
pub struct SessionStore {
    inner: RwLock<HashMap<Uuid, Arc<Mutex<WorkflowSession>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, roots: Vec<ProjectRef>) -> (Uuid, Arc<Mutex<WorkflowSession>>) {
        let session = WorkflowSession::new(roots);
        let id = session.id;
        let handle = Arc::new(Mutex::new(session));
        self.inner.write().await.insert(id, handle.clone());
        (id, handle)
    }

    pub async fn get(&self, id: &Uuid) -> Option<Arc<Mutex<WorkflowSession>>> {
        self.inner.read().await.get(id).cloned()
    }

    pub async fn count(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_hands_back_the_same_session() {
        let store = SessionStore::new();
        let (id, handle) = store.create(vec!["proj-a".to_string()]).await;

        handle.lock().await.push_turn(TurnRole::User, "hello");

        let again = store.get(&id).await.expect("session exists");
        assert_eq!(again.lock().await.turns.len(), 1);
        assert_eq!(store.count().await, 1);
        assert!(store.get(&Uuid::new_v4()).await.is_none());
    }

    #[test]
    fn new_sessions_start_in_scoping() {
        let session = WorkflowSession::new(vec!["proj-a".to_string()]);
        assert_eq!(session.state, WorkflowState::Scoping);
        assert!(session.pending_mutation.is_none());
        assert!(session.scope.is_empty());
    }
}
