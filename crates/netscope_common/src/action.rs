//! Firewall remediation actions.
//!
//! A staged action is the only mutating payload in the system. It is carried
//! verbatim from the oracle's proposal through confirmation to the executor,
//! so the user always confirms exactly what will be applied.

use serde::{Deserialize, Serialize};

use crate::scope::ProjectRef;

/// Recognized mutation verbs. Anything else is rejected before any external
/// call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleVerb {
    Create,
    Update,
    Delete,
}

impl RuleVerb {
    /// Parse the wire form. The verb travels as a plain string from the
    /// oracle so an unrecognized value can be turned into a FAILURE report
    /// instead of a deserialization fault.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CREATE" => Some(Self::Create),
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

/// One protocol/ports entry of a firewall rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficSpec {
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
}

/// A single firewall-rule mutation. Unset optional fields are stripped from
/// the serialized form before submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirewallAction {
    pub project_id: ProjectRef,
    /// CREATE | UPDATE | DELETE (validated at apply time).
    pub verb: String,
    pub rule_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_ranges: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<TrafficSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub denied: Vec<TrafficSpec>,
}

impl FirewallAction {
    /// One-line description shown to the user at confirmation time.
    pub fn describe(&self) -> String {
        let mut parts = vec![format!(
            "{} firewall rule `{}` in project `{}`",
            self.verb, self.rule_name, self.project_id
        )];
        if let Some(network) = &self.network {
            parts.push(format!("network `{}`", network));
        }
        if let Some(direction) = &self.direction {
            parts.push(format!("direction {}", direction));
        }
        if !self.source_ranges.is_empty() {
            parts.push(format!("source ranges {}", self.source_ranges.join(", ")));
        }
        for spec in &self.allowed {
            parts.push(format!("allow {} [{}]", spec.protocol, spec.ports.join(", ")));
        }
        for spec in &self.denied {
            parts.push(format!("deny {} [{}]", spec.protocol, spec.ports.join(", ")));
        }
        parts.join(", ")
    }
}

/// Outcome of one remediation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplyStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub status: ApplyStatus,
    pub message: String,
}

impl ApplyReport {
    pub fn success(message: impl Into<String>) -> Self {
        Self { status: ApplyStatus::Success, message: message.into() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { status: ApplyStatus::Failure, message: message.into() }
    }

    pub fn is_success(&self) -> bool {
        self.status == ApplyStatus::Success
    }
}
