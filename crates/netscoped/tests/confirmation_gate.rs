//! Property check for the mutation gate: no sequence of oracle decisions
//! reaches the firewall without an affirmative user turn between the
//! proposal and the apply.

mod common;

use common::{probe_request, sample_action, HarnessBuilder};

use netscope_common::ToolRequest;
use netscoped::oracle::{FakeOracle, OracleDecision};
use netscoped::session::WorkflowSession;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_decision(rng: &mut StdRng) -> OracleDecision {
    match rng.gen_range(0..5) {
        0 => OracleDecision::CallTool(probe_request()),
        1 => OracleDecision::CallTool(ToolRequest::CorrelateFlowLogs {
            projects: vec!["p1".to_string(), "p2".to_string()],
            src_ip: "10.0.0.1".to_string(),
            dst_ip: "10.0.0.2".to_string(),
            limit: 5,
            lookback_hours: 1,
        }),
        2 => OracleDecision::Propose {
            cause: "ingress tcp/443 is blocked".to_string(),
            action: sample_action(),
        },
        3 => OracleDecision::CallTool(ToolRequest::ApplyFirewallAction {
            action: sample_action(),
        }),
        _ => OracleDecision::Answer { text: "diagnosis complete".to_string() },
    }
}

/// User replies that must never open the gate.
const NON_AFFIRMATIVE_REPLIES: &[&str] = &[
    "no",
    "tell me more",
    "what does that rule do?",
    "hmm",
    "stop",
    "why that project?",
    "cancel",
    "not yet",
];

#[tokio::test]
async fn no_decision_sequence_mutates_without_confirmation() {
    let mut rng = StdRng::seed_from_u64(0x5c0_9e11);

    for _ in 0..200 {
        let decisions: Vec<OracleDecision> =
            (0..rng.gen_range(1..8)).map(|_| random_decision(&mut rng)).collect();

        let harness = HarnessBuilder::new(FakeOracle::scripted(decisions)).build();
        let mut session = WorkflowSession::new(vec!["proj-a".to_string()]);

        let turns = rng.gen_range(1..5);
        for i in 0..turns {
            let prompt = if i == 0 {
                "traffic from 10.0.0.1 to 10.0.0.2:443 is blocked"
            } else {
                NON_AFFIRMATIVE_REPLIES[rng.gen_range(0..NON_AFFIRMATIVE_REPLIES.len())]
            };
            if session.state.is_terminal() {
                break;
            }
            harness.workflow.handle_turn(&mut session, prompt).await.unwrap();
        }

        assert_eq!(
            harness.firewall.apply_count(),
            0,
            "mutation happened without an affirmative confirmation turn"
        );
    }
}

/// Positive control: with an affirmative turn after the proposal, exactly one
/// mutation goes through.
#[tokio::test]
async fn affirmative_turn_opens_the_gate_exactly_once() {
    let harness = HarnessBuilder::new(FakeOracle::scripted(vec![OracleDecision::Propose {
        cause: "ingress tcp/443 is blocked".to_string(),
        action: sample_action(),
    }]))
    .build();

    let mut session = WorkflowSession::new(vec!["proj-a".to_string()]);
    harness.workflow.handle_turn(&mut session, "443 is down").await.unwrap();
    harness.workflow.handle_turn(&mut session, "yes, go ahead").await.unwrap();

    assert_eq!(harness.firewall.apply_count(), 1);

    // A second approval cannot replay the mutation: the session is terminal
    // and the staged action is gone.
    harness.workflow.handle_turn(&mut session, "yes").await.unwrap();
    assert_eq!(harness.firewall.apply_count(), 1);
}
