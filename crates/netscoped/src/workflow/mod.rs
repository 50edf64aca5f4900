//! The troubleshooting workflow.
//!
//! State machine:
//!
//! ```text
//! SCOPING → DIAGNOSING → ROOT_CAUSED → AWAITING_CONFIRMATION → APPLYING → VERIFYING → DONE
//!                ↺ (evidence loop)            │
//!                └──────── ambiguous reply ───┘        ABORTED (from any state)
//! ```
//!
//! ## Invariants
//!
//! 1. Scope discovery always runs before any other evidence call.
//! 2. At most MAX_ORACLE_DECISIONS_PER_TURN oracle decisions per user turn.
//! 3. No mutation without an affirmative user turn strictly between
//!    ROOT_CAUSED and APPLYING. The diagnostic agent has no handle to the
//!    firewall surface, so this holds structurally, not just by checks.
//! 4. APPLYING is always followed by VERIFYING, whatever the mutation
//!    outcome, so the user learns which state the network is actually in.

pub mod confirm;
pub mod prompts;

use std::sync::Arc;
use tracing::{info, warn};

use netscope_common::{
    is_permitted, permitted_tools, AgentRole, ApplyReport, EvidenceKind, FirewallAction,
    NetscopeError, ReachabilityResult, ToolRequest, TurnRole, WorkflowState,
};

use crate::cloud::{
    FirewallApi, FlowLogStore, ReachabilitySpec, ReachabilityService, ResourceInventory,
};
use crate::flowlog::FlowLogCorrelator;
use crate::reachability::ReachabilityProber;
use crate::remediation::RemediationExecutor;
use crate::scope::{ResourceGraphProbe, ScopeDiscoverer, RESOURCE_KIND_CATALOG};
use crate::session::{PendingMutation, WorkflowSession};
use crate::oracle::{OracleDecision, ReasoningOracle};
use confirm::{classify_reply, ConfirmationReply};
use prompts::{confirmation_request, DIAGNOSTICIAN_INSTRUCTION};

/// Upper bound on oracle decisions within one user turn. Keeps a looping
/// model from holding a turn open indefinitely.
pub const MAX_ORACLE_DECISIONS_PER_TURN: usize = 8;

// ============================================================================
// Diagnostic agent
// ============================================================================

/// Owns SCOPING, DIAGNOSING, ROOT_CAUSED and AWAITING_CONFIRMATION. Holds
/// every read-only collaborator and, deliberately, no mutating one.
pub struct DiagnosticAgent {
    oracle: Arc<dyn ReasoningOracle>,
    inventory: Arc<dyn ResourceInventory>,
    discoverer: ScopeDiscoverer,
    prober: ReachabilityProber,
    correlator: FlowLogCorrelator,
}

impl DiagnosticAgent {
    pub fn new(
        oracle: Arc<dyn ReasoningOracle>,
        inventory: Arc<dyn ResourceInventory>,
        reachability: Arc<dyn ReachabilityService>,
        flow_logs: Arc<dyn FlowLogStore>,
        deny_list: Vec<String>,
    ) -> Self {
        let probe = ResourceGraphProbe::new(inventory.clone(), deny_list.clone());
        Self {
            oracle,
            inventory,
            discoverer: ScopeDiscoverer::new(probe),
            prober: ReachabilityProber::new(reachability, deny_list),
            correlator: FlowLogCorrelator::new(flow_logs),
        }
    }

    /// Mandatory first step: discover the project scope around the declared
    /// roots before any other evidence call. A fix proposed without knowing
    /// the Shared-VPC/peering scope would likely target the wrong project.
    pub async fn run_scoping(&self, session: &mut WorkflowSession) {
        let roots = session.roots.clone();
        info!("  Scoping {} root project(s)", roots.len());

        let scope = self.discoverer.discover(&roots).await;
        session.scope.merge(&scope);
        let summary = session.scope.summary();
        session.add_evidence_with_detail(
            EvidenceKind::ScopeDiscovery,
            summary,
            serde_json::to_value(&scope).unwrap_or_default(),
        );
        let described = describe_scope(session);
        session.push_turn(TurnRole::Tool, format!("Discovered scope: {}", described));
    }

    /// The oracle-driven evidence loop. Returns the user-facing response and
    /// leaves the session in DIAGNOSING, AWAITING_CONFIRMATION or DONE.
    pub async fn diagnose(&self, session: &mut WorkflowSession) -> Result<String, NetscopeError> {
        let permitted = permitted_tools(AgentRole::Diagnostician);

        for _ in 0..MAX_ORACLE_DECISIONS_PER_TURN {
            let decision =
                self.oracle.decide(DIAGNOSTICIAN_INSTRUCTION, &session.turns, permitted).await;

            match decision {
                Ok(OracleDecision::CallTool(request)) => {
                    let name = request.name();
                    if !is_permitted(AgentRole::Diagnostician, name) {
                        warn!("  Oracle requested out-of-role tool `{}`", name);
                        session.push_turn(
                            TurnRole::Tool,
                            format!("tool `{}` is not available to the diagnostic role", name),
                        );
                        continue;
                    }
                    if let Err(e) = request.validate() {
                        session.push_turn(
                            TurnRole::Tool,
                            format!("invalid `{}` request: {}", name, e),
                        );
                        continue;
                    }
                    let summary = self.dispatch(session, request).await;
                    session.push_turn(TurnRole::Tool, summary);
                }
                Ok(OracleDecision::Propose { cause, action }) => {
                    return Ok(self.stage_proposal(session, cause, action));
                }
                Ok(OracleDecision::Answer { text }) => {
                    session.state = WorkflowState::Done;
                    return Ok(text);
                }
                Err(e) => {
                    warn!("  Oracle decision unusable: {}", e);
                    session.add_evidence(
                        EvidenceKind::Note,
                        format!("oracle produced no usable decision: {}", e),
                    );
                    return Ok(self.evidence_fallback(session));
                }
            }
        }

        session.add_evidence(EvidenceKind::Note, "decision cap reached for this turn");
        Ok(self.evidence_fallback(session))
    }

    /// DIAGNOSING → ROOT_CAUSED → AWAITING_CONFIRMATION. The action is
    /// staged, surfaced, and nothing else happens until the user replies.
    fn stage_proposal(
        &self,
        session: &mut WorkflowSession,
        cause: String,
        action: FirewallAction,
    ) -> String {
        session.state = WorkflowState::RootCaused;
        let description = action.describe();
        session.add_evidence_with_detail(
            EvidenceKind::Proposal,
            format!("root cause: {}", cause),
            serde_json::to_value(&action).unwrap_or_default(),
        );
        session.pending_mutation = Some(PendingMutation { cause: cause.clone(), action });
        session.state = WorkflowState::AwaitingConfirmation;

        info!("  Staged remediation awaiting confirmation: {}", description);
        confirmation_request(&cause, &description)
    }

    /// Re-run the reachability probe after a mutation, with the same
    /// source/destination as the original diagnosis.
    pub async fn verify(
        &self,
        session: &mut WorkflowSession,
        spec: &ReachabilitySpec,
    ) -> ReachabilityResult {
        let result = self.prober.probe(spec).await;
        session.add_evidence_with_detail(
            EvidenceKind::Verification,
            format!(
                "post-fix reachability {} -> {}: {}",
                spec.source.describe(),
                spec.destination.describe(),
                result.verdict.as_str()
            ),
            serde_json::to_value(&result).unwrap_or_default(),
        );
        session.last_reachability = Some(result.clone());
        result
    }

    async fn dispatch(&self, session: &mut WorkflowSession, request: ToolRequest) -> String {
        match request {
            ToolRequest::DiscoverScope { roots } => {
                let scope = self.discoverer.discover(&roots).await;
                session.scope.merge(&scope);
                let summary = session.scope.summary();
                session.add_evidence_with_detail(
                    EvidenceKind::ScopeDiscovery,
                    summary,
                    serde_json::to_value(&scope).unwrap_or_default(),
                );
                format!("Discovered scope: {}", describe_scope(session))
            }
            ToolRequest::InspectTopology { project_id, kind } => {
                self.inspect_topology(session, &project_id, kind.as_deref()).await
            }
            ToolRequest::ProbeReachability { project_id, source, destination, protocol } => {
                let spec = ReachabilitySpec { project_id, source, destination, protocol };
                let result = self.prober.probe(&spec).await;

                // Projects seen on the trace join the scope with provenance.
                for project in &result.discovered_projects {
                    session.scope.add_edge(
                        &spec.project_id,
                        project,
                        "observed on reachability test trace",
                    );
                }
                session.add_evidence_with_detail(
                    EvidenceKind::Reachability,
                    format!(
                        "reachability {} -> {}: {}",
                        spec.source.describe(),
                        spec.destination.describe(),
                        result.verdict.as_str()
                    ),
                    serde_json::to_value(&result).unwrap_or_default(),
                );
                session.last_probe_spec = Some(spec);
                session.last_reachability = Some(result.clone());

                let mut summary = format!(
                    "Reachability verdict: {}. Trace: {}",
                    result.verdict.as_str(),
                    if result.trace.is_empty() {
                        "<none>".to_string()
                    } else {
                        result.trace.join(" | ")
                    }
                );
                if let Some(hint) = &result.hint {
                    summary.push_str(&format!(" Hint: {}", hint));
                }
                summary
            }
            ToolRequest::CorrelateFlowLogs { projects, src_ip, dst_ip, limit, lookback_hours } => {
                let correlation =
                    self.correlator.correlate(&projects, &src_ip, &dst_ip, limit, lookback_hours).await;
                session.add_evidence_with_detail(
                    EvidenceKind::FlowLogs,
                    correlation.message.clone(),
                    serde_json::to_value(&correlation).unwrap_or_default(),
                );

                let mut summary = correlation.message.clone();
                for error in &correlation.errors {
                    summary.push_str(&format!(
                        " [{}: query failed: {}]",
                        error.project, error.message
                    ));
                }
                for record in correlation.records.iter().take(3) {
                    summary.push_str(&format!(
                        " [{} {}:{} -> {}:{} {} {}B]",
                        record.timestamp.to_rfc3339(),
                        record.src_ip,
                        record.src_port,
                        record.dst_ip,
                        record.dst_port,
                        record.protocol,
                        record.bytes_sent
                    ));
                }
                summary
            }
            // Unreachable through diagnose(): the permission check refuses
            // the tool before dispatch, and this agent could not apply it
            // anyway.
            ToolRequest::ApplyFirewallAction { .. } => {
                "tool `apply_firewall_action` is not available to the diagnostic role".to_string()
            }
        }
    }

    async fn inspect_topology(
        &self,
        session: &mut WorkflowSession,
        project_id: &str,
        kind: Option<&str>,
    ) -> String {
        let kinds: Vec<&str> = match kind {
            Some(kind) => vec![kind],
            None => RESOURCE_KIND_CATALOG.to_vec(),
        };

        let mut lines = Vec::new();
        for kind in kinds {
            match self.inventory.list_resources(project_id, kind).await {
                Ok(resources) => {
                    let names: Vec<&str> =
                        resources.iter().map(|r| r.name.as_str()).collect();
                    lines.push(format!("{}: [{}]", kind, names.join(", ")));
                }
                Err(e) => lines.push(format!("{}: query failed: {}", kind, e)),
            }
        }

        let summary = format!("Topology of `{}` - {}", project_id, lines.join("; "));
        session.add_evidence(EvidenceKind::Topology, summary.clone());
        summary
    }

    fn evidence_fallback(&self, session: &WorkflowSession) -> String {
        let mut text = String::from(
            "I could not reach a conclusion on this turn. Evidence gathered so far:\n",
        );
        if session.evidence.is_empty() {
            text.push_str("- none\n");
        }
        for entry in &session.evidence {
            text.push_str(&format!("- {}\n", entry.summary));
        }
        text.push_str("You can narrow the question or provide endpoints to probe.");
        text
    }
}

fn describe_scope(session: &WorkflowSession) -> String {
    let projects: Vec<&str> = session.scope.visited.iter().map(|p| p.as_str()).collect();
    let mut text = format!("projects [{}]", projects.join(", "));
    if !session.scope.edges.is_empty() {
        let reasons: Vec<String> = session
            .scope
            .edges
            .iter()
            .map(|e| format!("{} -> {} ({})", e.source, e.target, e.reason))
            .collect();
        text.push_str(&format!("; references: {}", reasons.join("; ")));
    }
    text
}

// ============================================================================
// Remediation agent
// ============================================================================

/// Owns APPLYING and nothing else. The only component holding the mutating
/// capability.
pub struct RemediationAgent {
    executor: RemediationExecutor,
}

impl RemediationAgent {
    pub fn new(firewall: Arc<dyn FirewallApi>) -> Self {
        Self { executor: RemediationExecutor::new(firewall) }
    }

    pub async fn apply(&self, action: &FirewallAction) -> ApplyReport {
        self.executor.apply(action).await
    }
}

// ============================================================================
// Workflow
// ============================================================================

/// The coordinator. Routes each user turn to the right agent and never calls
/// a tool itself.
pub struct TroubleshootingWorkflow {
    diagnostic: DiagnosticAgent,
    remediation: RemediationAgent,
}

impl TroubleshootingWorkflow {
    pub fn new(
        oracle: Arc<dyn ReasoningOracle>,
        inventory: Arc<dyn ResourceInventory>,
        reachability: Arc<dyn ReachabilityService>,
        flow_logs: Arc<dyn FlowLogStore>,
        firewall: Arc<dyn FirewallApi>,
        deny_list: Vec<String>,
    ) -> Self {
        Self {
            diagnostic: DiagnosticAgent::new(
                oracle,
                inventory,
                reachability,
                flow_logs,
                deny_list,
            ),
            remediation: RemediationAgent::new(firewall),
        }
    }

    /// Whether the reasoning backend answers at all. Checked before a
    /// session's first turn so an unreachable model fails fast and clearly.
    pub async fn oracle_available(&self) -> bool {
        self.diagnostic.oracle.is_available().await
    }

    /// Process one user turn against a session. The caller holds the session
    /// lock, which serializes turns and keeps at most one mutation in flight
    /// per session.
    pub async fn handle_turn(
        &self,
        session: &mut WorkflowSession,
        prompt: &str,
    ) -> Result<String, NetscopeError> {
        session.push_turn(TurnRole::User, prompt);

        let response = match session.state {
            WorkflowState::Scoping => {
                self.diagnostic.run_scoping(session).await;
                session.state = WorkflowState::Diagnosing;
                self.diagnostic.diagnose(session).await?
            }
            WorkflowState::Diagnosing => self.diagnostic.diagnose(session).await?,
            WorkflowState::AwaitingConfirmation => {
                self.handle_confirmation(session, prompt).await?
            }
            WorkflowState::Done => {
                "This session has concluded. Start a new session for a new problem.".to_string()
            }
            WorkflowState::Aborted => {
                "This session was aborted and made no changes. Start a new session to continue."
                    .to_string()
            }
            WorkflowState::RootCaused | WorkflowState::Applying | WorkflowState::Verifying => {
                return Err(NetscopeError::Internal(format!(
                    "session {} at rest in transient state {:?}",
                    session.id, session.state
                )));
            }
        };

        session.push_turn(TurnRole::Assistant, response.clone());
        Ok(response)
    }

    async fn handle_confirmation(
        &self,
        session: &mut WorkflowSession,
        prompt: &str,
    ) -> Result<String, NetscopeError> {
        match classify_reply(prompt) {
            ConfirmationReply::Affirmative => self.apply_and_verify(session).await,
            ConfirmationReply::Negative => {
                session.pending_mutation = None;
                session.state = WorkflowState::Aborted;
                session.add_evidence(EvidenceKind::Note, "user declined the proposed fix");
                Ok("Understood - no changes were applied.".to_string())
            }
            ConfirmationReply::Ambiguous => {
                // Back to diagnosis with the reply in history; a revised
                // proposal will be staged afresh.
                session.pending_mutation = None;
                session.state = WorkflowState::Diagnosing;
                self.diagnostic.diagnose(session).await
            }
        }
    }

    /// AWAITING_CONFIRMATION → APPLYING → VERIFYING → DONE. The only path to
    /// the remediation agent, and it starts from an affirmative user turn.
    async fn apply_and_verify(
        &self,
        session: &mut WorkflowSession,
    ) -> Result<String, NetscopeError> {
        let pending = session.pending_mutation.take().ok_or_else(|| {
            NetscopeError::Internal("awaiting confirmation with no staged mutation".to_string())
        })?;

        session.state = WorkflowState::Applying;
        let report = self.remediation.apply(&pending.action).await;
        session.add_evidence_with_detail(
            EvidenceKind::Mutation,
            format!("{:?}: {}", report.status, report.message),
            serde_json::to_value(&pending.action).unwrap_or_default(),
        );

        // Unconditional: verify even when the mutation reported failure, so
        // the user learns whether the network is in the pre- or post-fix
        // state.
        session.state = WorkflowState::Verifying;
        let verification = match session.last_probe_spec.clone() {
            Some(spec) => {
                let result = self.diagnostic.verify(session, &spec).await;
                format!(
                    "Post-fix verification ({} -> {}): {}",
                    spec.source.describe(),
                    spec.destination.describe(),
                    result.verdict.as_str()
                )
            }
            None => {
                session.add_evidence(
                    EvidenceKind::Note,
                    "verification skipped: no prior reachability probe to repeat",
                );
                "Post-fix verification skipped: no reachability probe was run during diagnosis."
                    .to_string()
            }
        };

        session.state = WorkflowState::Done;
        let applied = if report.is_success() { "Remediation applied" } else { "Remediation FAILED" };
        Ok(format!("{}: {}\n{}", applied, report.message, verification))
    }
}
