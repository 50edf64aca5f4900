//! Terminal output formatting.

use console::style;

use netscope_common::{
    EvidenceEntry, EvidenceKind, HealthResponse, SessionResponse, TroubleshootResponse,
    WorkflowState,
};

fn state_label(state: WorkflowState) -> String {
    let text = format!("{:?}", state).to_uppercase();
    match state {
        WorkflowState::Done => style(text).green().to_string(),
        WorkflowState::Aborted => style(text).red().to_string(),
        WorkflowState::AwaitingConfirmation => style(text).yellow().bold().to_string(),
        _ => style(text).cyan().to_string(),
    }
}

fn kind_tag(kind: EvidenceKind) -> &'static str {
    match kind {
        EvidenceKind::ScopeDiscovery => "scope",
        EvidenceKind::Topology => "topology",
        EvidenceKind::Reachability => "reachability",
        EvidenceKind::FlowLogs => "flow-logs",
        EvidenceKind::Proposal => "proposal",
        EvidenceKind::Mutation => "mutation",
        EvidenceKind::Verification => "verification",
        EvidenceKind::Note => "note",
    }
}

fn print_evidence(trail: &[EvidenceEntry]) {
    if trail.is_empty() {
        return;
    }
    println!("\n{}", style("Evidence trail:").bold());
    for entry in trail {
        println!(
            "  {} [{}] {}",
            style(entry.timestamp.format("%H:%M:%S")).dim(),
            style(kind_tag(entry.kind)).magenta(),
            entry.summary
        );
    }
}

pub fn print_troubleshoot(response: &TroubleshootResponse) {
    println!("{}  session {}", state_label(response.state), style(response.session_id).dim());
    println!("\n{}", response.response);
    print_evidence(&response.evidence_trail);

    if response.state == WorkflowState::AwaitingConfirmation {
        println!(
            "\n{}",
            style(format!(
                "To answer, continue the session:\n  netscopectl ask --session {} \"yes\"",
                response.session_id
            ))
            .yellow()
        );
    }
}

pub fn print_health(health: &HealthResponse) {
    println!(
        "{} netscoped v{}  uptime {}s  {} active session(s)",
        style(&health.status).green().bold(),
        health.version,
        health.uptime_seconds,
        health.active_sessions
    );
}

pub fn print_session(session: &SessionResponse) {
    println!(
        "{}  session {}  {} turn(s)",
        state_label(session.state),
        style(session.session_id).dim(),
        session.turns
    );
    print_evidence(&session.evidence_trail);
}
