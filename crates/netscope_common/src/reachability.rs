//! Reachability test results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::scope::ProjectRef;

/// Verdict of one active path test, mapped from the provider's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReachabilityVerdict {
    Reachable,
    Unreachable,
    Ambiguous,
    Undetermined,
}

impl ReachabilityVerdict {
    /// Map the provider's result string. Anything unrecognized is
    /// UNDETERMINED rather than an error, so a vocabulary drift on the
    /// provider side degrades instead of breaking the workflow.
    pub fn from_provider(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "REACHABLE" => Self::Reachable,
            "UNREACHABLE" => Self::Unreachable,
            "AMBIGUOUS" => Self::Ambiguous,
            _ => Self::Undetermined,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reachable => "REACHABLE",
            Self::Unreachable => "UNREACHABLE",
            Self::Ambiguous => "AMBIGUOUS",
            Self::Undetermined => "UNDETERMINED",
        }
    }
}

/// One endpoint of a path test: an IP, an instance reference, or both,
/// with an optional destination port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl Endpoint {
    pub fn ip(ip: &str) -> Self {
        Self { ip: Some(ip.to_string()), instance: None, port: None }
    }

    pub fn ip_port(ip: &str, port: u16) -> Self {
        Self { ip: Some(ip.to_string()), instance: None, port: Some(port) }
    }

    pub fn is_addressable(&self) -> bool {
        self.ip.is_some() || self.instance.is_some()
    }

    pub fn describe(&self) -> String {
        match (&self.ip, &self.instance) {
            (Some(ip), _) => match self.port {
                Some(port) => format!("{}:{}", ip, port),
                None => ip.clone(),
            },
            (None, Some(instance)) => instance.clone(),
            (None, None) => "<unspecified>".to_string(),
        }
    }
}

/// Result of one reachability probe: verdict, ordered hop trace, and any
/// project identifiers observed along the path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReachabilityResult {
    pub test_id: String,
    pub verdict: ReachabilityVerdict,
    /// Ordered hop descriptions, as reported by the provider.
    pub trace: Vec<String>,
    /// Projects found by scanning the trace text.
    pub discovered_projects: BTreeSet<ProjectRef>,
    /// Remediation hint when the test could not be created or evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_vocabulary_maps_onto_verdicts() {
        assert_eq!(ReachabilityVerdict::from_provider("REACHABLE"), ReachabilityVerdict::Reachable);
        assert_eq!(
            ReachabilityVerdict::from_provider("unreachable"),
            ReachabilityVerdict::Unreachable
        );
        assert_eq!(ReachabilityVerdict::from_provider("AMBIGUOUS"), ReachabilityVerdict::Ambiguous);
        assert_eq!(
            ReachabilityVerdict::from_provider("RESULT_UNSPECIFIED"),
            ReachabilityVerdict::Undetermined
        );
        assert_eq!(ReachabilityVerdict::from_provider(""), ReachabilityVerdict::Undetermined);
    }

    #[test]
    fn endpoint_describes_itself() {
        assert_eq!(Endpoint::ip_port("10.0.0.2", 443).describe(), "10.0.0.2:443");
        assert_eq!(Endpoint::ip("10.0.0.2").describe(), "10.0.0.2");
        assert!(!Endpoint::default().is_addressable());
    }
}
