//! The reasoning oracle.
//!
//! The oracle consumes the conversation so far, a fixed role instruction and
//! the names of the tools the current role may use, and answers with exactly
//! one decision: call a tool, propose a remediation, or give a final answer.
//! The HTTP client targets an Ollama-compatible generate endpoint; tests use
//! the scripted fake.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

use netscope_common::{FirewallAction, NetscopeError, ToolRequest, Turn, TurnRole};

/// One oracle decision.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleDecision {
    /// Invoke a tool and report the result back.
    CallTool(ToolRequest),
    /// State a root cause and stage a concrete action for confirmation.
    Propose { cause: String, action: FirewallAction },
    /// The conversation is answerable without further tool calls.
    Answer { text: String },
}

impl OracleDecision {
    /// Parse a decision from raw model output. Models wrap JSON in prose and
    /// code fences; extract the outermost object and dispatch on its
    /// `action` field.
    pub fn parse(text: &str) -> Result<Self, NetscopeError> {
        let json_text = extract_json(text);
        let value: Value = serde_json::from_str(&json_text)
            .map_err(|e| NetscopeError::Oracle(format!("decision is not JSON: {}", e)))?;

        match value.get("action").and_then(|a| a.as_str()) {
            Some("call_tool") => {
                let request: ToolRequest = serde_json::from_value(value.clone()).map_err(|e| {
                    NetscopeError::Oracle(format!("malformed tool invocation: {}", e))
                })?;
                Ok(OracleDecision::CallTool(request))
            }
            Some("propose_remediation") => {
                let cause = value
                    .get("cause")
                    .and_then(|c| c.as_str())
                    .ok_or_else(|| {
                        NetscopeError::Oracle("proposal is missing a `cause`".to_string())
                    })?
                    .to_string();
                let action_value = value.get("remediation").cloned().ok_or_else(|| {
                    NetscopeError::Oracle("proposal is missing a `remediation`".to_string())
                })?;
                let action: FirewallAction =
                    serde_json::from_value(action_value).map_err(|e| {
                        NetscopeError::Oracle(format!("malformed remediation action: {}", e))
                    })?;
                Ok(OracleDecision::Propose { cause, action })
            }
            Some("final_answer") => {
                let text = value
                    .get("text")
                    .and_then(|t| t.as_str())
                    .ok_or_else(|| NetscopeError::Oracle("answer is missing `text`".to_string()))?
                    .to_string();
                Ok(OracleDecision::Answer { text })
            }
            Some(other) => {
                Err(NetscopeError::Oracle(format!("unknown decision action `{}`", other)))
            }
            None => Err(NetscopeError::Oracle("decision has no `action` field".to_string())),
        }
    }
}

/// Extract JSON from text that may have prose around it.
fn extract_json(text: &str) -> String {
    if let Some(start) = text.find('{') {
        if let Some(end) = text.rfind('}') {
            if end > start {
                return text[start..=end].to_string();
            }
        }
    }
    text.to_string()
}

#[async_trait]
pub trait ReasoningOracle: Send + Sync {
    /// Produce the next decision for the given role.
    async fn decide(
        &self,
        instruction: &str,
        history: &[Turn],
        permitted_tools: &[&str],
    ) -> Result<OracleDecision, NetscopeError>;

    /// Whether the backing model endpoint answers at all.
    async fn is_available(&self) -> bool;
}

// ============================================================================
// HTTP client (production)
// ============================================================================

pub struct OracleClient {
    http_client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OracleClient {
    pub fn new(endpoint: &str, model: &str, timeout_secs: u64) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    fn build_prompt(instruction: &str, history: &[Turn], permitted_tools: &[&str]) -> String {
        let mut prompt = String::new();
        prompt.push_str(instruction);
        prompt.push_str("\n\nTools available to you in this role: ");
        prompt.push_str(&permitted_tools.join(", "));
        prompt.push_str("\n\nConversation so far:\n");
        for turn in history {
            let role = match turn.role {
                TurnRole::User => "USER",
                TurnRole::Assistant => "ASSISTANT",
                TurnRole::Tool => "TOOL RESULT",
            };
            prompt.push_str(&format!("[{}] {}\n", role, turn.content));
        }
        prompt.push_str("\nRespond with a single JSON object and nothing else.\n");
        prompt
    }
}

#[async_trait]
impl ReasoningOracle for OracleClient {
    async fn decide(
        &self,
        instruction: &str,
        history: &[Turn],
        permitted_tools: &[&str],
    ) -> Result<OracleDecision, NetscopeError> {
        let prompt = Self::build_prompt(instruction, history, permitted_tools);
        debug!("  Oracle prompt: {} chars", prompt.len());

        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "format": "json",
        });

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| NetscopeError::Oracle(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NetscopeError::Oracle(format!(
                "oracle request failed: {}",
                response.status()
            )));
        }

        let json: Value =
            response.json().await.map_err(|e| NetscopeError::Oracle(e.to_string()))?;
        let text = json.get("response").and_then(|r| r.as_str()).unwrap_or_default();

        match OracleDecision::parse(text) {
            Ok(decision) => Ok(decision),
            Err(e) => {
                warn!("  Unparseable oracle output: {} - text: {}", e, text);
                Err(e)
            }
        }
    }

    async fn is_available(&self) -> bool {
        let client = match reqwest::Client::builder().timeout(Duration::from_secs(2)).build() {
            Ok(client) => client,
            Err(_) => return false,
        };
        client
            .get(format!("{}/api/tags", self.endpoint))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

// ============================================================================
// Scripted fake (testing)
// ============================================================================

/// Replays a scripted decision sequence and records what each call was
/// permitted to use, so tests can assert on the authorization boundary.
pub struct FakeOracle {
    script: Mutex<VecDeque<Result<OracleDecision, String>>>,
    seen_permitted: Mutex<Vec<Vec<String>>>,
    available: bool,
}

impl FakeOracle {
    pub fn scripted(decisions: Vec<OracleDecision>) -> Self {
        Self {
            script: Mutex::new(decisions.into_iter().map(Ok).collect()),
            seen_permitted: Mutex::new(Vec::new()),
            available: true,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            seen_permitted: Mutex::new(Vec::new()),
            available: false,
        }
    }

    pub fn push_error(self, message: &str) -> Self {
        self.script.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    pub fn push(self, decision: OracleDecision) -> Self {
        self.script.lock().unwrap().push_back(Ok(decision));
        self
    }

    pub fn decide_count(&self) -> usize {
        self.seen_permitted.lock().unwrap().len()
    }

    /// The permitted tool sets observed, one per decide call.
    pub fn permitted_tool_sets(&self) -> Vec<Vec<String>> {
        self.seen_permitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReasoningOracle for FakeOracle {
    async fn decide(
        &self,
        _instruction: &str,
        _history: &[Turn],
        permitted_tools: &[&str],
    ) -> Result<OracleDecision, NetscopeError> {
        self.seen_permitted
            .lock()
            .unwrap()
            .push(permitted_tools.iter().map(|t| t.to_string()).collect());

        match self.script.lock().unwrap().pop_front() {
            Some(Ok(decision)) => Ok(decision),
            Some(Err(message)) => Err(NetscopeError::Oracle(message)),
            None => Ok(OracleDecision::Answer {
                text: "No further findings.".to_string(),
            }),
        }
    }

    async fn is_available(&self) -> bool {
        self.available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_tool_invocation_wrapped_in_prose() {
        let text = r#"Sure, I'll check the logs first.
        {"action": "call_tool", "tool": "correlate_flow_logs",
         "args": {"projects": ["p1"], "src_ip": "10.0.0.1", "dst_ip": "10.0.0.2"}}"#;

        match OracleDecision::parse(text).unwrap() {
            OracleDecision::CallTool(ToolRequest::CorrelateFlowLogs { projects, .. }) => {
                assert_eq!(projects, vec!["p1".to_string()]);
            }
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn parses_a_remediation_proposal() {
        let text = r#"{"action": "propose_remediation",
            "cause": "ingress on tcp/443 is blocked by `deny-all`",
            "remediation": {
                "project_id": "proj-host",
                "verb": "CREATE",
                "rule_name": "allow-443",
                "source_ranges": ["10.0.0.0/8"],
                "allowed": [{"protocol": "tcp", "ports": ["443"]}]
            }}"#;

        match OracleDecision::parse(text).unwrap() {
            OracleDecision::Propose { cause, action } => {
                assert!(cause.contains("deny-all"));
                assert_eq!(action.rule_name, "allow-443");
                assert_eq!(action.verb, "CREATE");
            }
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn parses_a_final_answer() {
        let text = r#"{"action": "final_answer", "text": "Traffic is reachable."}"#;
        assert_eq!(
            OracleDecision::parse(text).unwrap(),
            OracleDecision::Answer { text: "Traffic is reachable.".to_string() }
        );
    }

    #[test]
    fn rejects_output_without_a_decision() {
        assert!(OracleDecision::parse("I think the firewall is wrong.").is_err());
        assert!(OracleDecision::parse(r#"{"action": "sudo_apply"}"#).is_err());
        assert!(OracleDecision::parse(r#"{"verdict": "fine"}"#).is_err());
    }

    #[tokio::test]
    async fn fake_records_permitted_tool_sets() {
        let oracle = FakeOracle::scripted(vec![OracleDecision::Answer { text: "done".to_string() }]);
        let _ = oracle.decide("inst", &[], &["probe_reachability"]).await.unwrap();

        assert_eq!(oracle.decide_count(), 1);
        assert_eq!(oracle.permitted_tool_sets(), vec![vec!["probe_reachability".to_string()]]);
    }
}
