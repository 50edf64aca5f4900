//! The closed tool set and the role→permitted-tool table.
//!
//! Every operation the oracle can request is one variant of [`ToolRequest`],
//! deserialized and validated at the boundary before any external call. There
//! is no loosely-typed argument bag anywhere in the dispatch path.
//!
//! The role table is the authorization boundary in data form: the diagnostic
//! role's set does not contain the mutating tool, so no oracle decision can
//! route a mutation through diagnosis.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use thiserror::Error;

use crate::action::FirewallAction;
use crate::reachability::Endpoint;
use crate::scope::ProjectRef;

pub const TOOL_DISCOVER_SCOPE: &str = "discover_scope";
pub const TOOL_INSPECT_TOPOLOGY: &str = "inspect_topology";
pub const TOOL_PROBE_REACHABILITY: &str = "probe_reachability";
pub const TOOL_CORRELATE_FLOW_LOGS: &str = "correlate_flow_logs";
pub const TOOL_APPLY_FIREWALL_ACTION: &str = "apply_firewall_action";

fn default_flow_limit() -> usize {
    20
}

fn default_lookback_hours() -> u32 {
    6
}

/// One tagged request variant per operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", content = "args", rename_all = "snake_case")]
pub enum ToolRequest {
    DiscoverScope {
        roots: Vec<ProjectRef>,
    },
    InspectTopology {
        project_id: ProjectRef,
        /// Restrict to one resource kind; all catalog kinds when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
    },
    ProbeReachability {
        project_id: ProjectRef,
        source: Endpoint,
        destination: Endpoint,
        protocol: String,
    },
    CorrelateFlowLogs {
        projects: Vec<ProjectRef>,
        src_ip: String,
        dst_ip: String,
        #[serde(default = "default_flow_limit")]
        limit: usize,
        #[serde(default = "default_lookback_hours")]
        lookback_hours: u32,
    },
    ApplyFirewallAction {
        action: FirewallAction,
    },
}

/// Boundary validation failures. These reject the request before any
/// external call, instead of silently proceeding with missing fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),

    #[error("`{0}` is not a valid IP address: {1}")]
    InvalidIp(&'static str, String),

    #[error("{0} endpoint needs an `ip` or an `instance`")]
    UnaddressableEndpoint(&'static str),

    #[error("`limit` must be at least 1")]
    ZeroLimit,

    #[error("`lookback_hours` must be at least 1")]
    ZeroLookback,
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}

fn require_ip(field: &'static str, value: &str) -> Result<(), ValidationError> {
    require_non_empty(field, value)?;
    value
        .parse::<IpAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::InvalidIp(field, value.to_string()))
}

impl ToolRequest {
    /// Declared tool name, as it appears in the role table and in oracle
    /// decisions.
    pub fn name(&self) -> &'static str {
        match self {
            ToolRequest::DiscoverScope { .. } => TOOL_DISCOVER_SCOPE,
            ToolRequest::InspectTopology { .. } => TOOL_INSPECT_TOPOLOGY,
            ToolRequest::ProbeReachability { .. } => TOOL_PROBE_REACHABILITY,
            ToolRequest::CorrelateFlowLogs { .. } => TOOL_CORRELATE_FLOW_LOGS,
            ToolRequest::ApplyFirewallAction { .. } => TOOL_APPLY_FIREWALL_ACTION,
        }
    }

    /// Schema validation beyond shape: run before dispatch, never after.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            ToolRequest::DiscoverScope { roots } => {
                if roots.is_empty() {
                    return Err(ValidationError::EmptyField("roots"));
                }
                for root in roots {
                    require_non_empty("roots", root)?;
                }
                Ok(())
            }
            ToolRequest::InspectTopology { project_id, .. } => {
                require_non_empty("project_id", project_id)
            }
            ToolRequest::ProbeReachability { project_id, source, destination, protocol } => {
                require_non_empty("project_id", project_id)?;
                require_non_empty("protocol", protocol)?;
                if !source.is_addressable() {
                    return Err(ValidationError::UnaddressableEndpoint("source"));
                }
                if !destination.is_addressable() {
                    return Err(ValidationError::UnaddressableEndpoint("destination"));
                }
                if let Some(ip) = &source.ip {
                    require_ip("source.ip", ip)?;
                }
                if let Some(ip) = &destination.ip {
                    require_ip("destination.ip", ip)?;
                }
                Ok(())
            }
            ToolRequest::CorrelateFlowLogs { projects, src_ip, dst_ip, limit, lookback_hours } => {
                if projects.is_empty() {
                    return Err(ValidationError::EmptyField("projects"));
                }
                require_ip("src_ip", src_ip)?;
                require_ip("dst_ip", dst_ip)?;
                if *limit == 0 {
                    return Err(ValidationError::ZeroLimit);
                }
                if *lookback_hours == 0 {
                    return Err(ValidationError::ZeroLookback);
                }
                Ok(())
            }
            ToolRequest::ApplyFirewallAction { action } => {
                require_non_empty("action.project_id", &action.project_id)?;
                require_non_empty("action.rule_name", &action.rule_name)
            }
        }
    }
}

/// The workflow's roles. The coordinator holds no tools at all; diagnosis
/// holds the read-only set; only remediation holds the mutating tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Coordinator,
    Diagnostician,
    Remediator,
}

/// The role→permitted-tool table.
pub fn permitted_tools(role: AgentRole) -> &'static [&'static str] {
    match role {
        AgentRole::Coordinator => &[],
        AgentRole::Diagnostician => &[
            TOOL_DISCOVER_SCOPE,
            TOOL_INSPECT_TOPOLOGY,
            TOOL_PROBE_REACHABILITY,
            TOOL_CORRELATE_FLOW_LOGS,
        ],
        AgentRole::Remediator => &[TOOL_APPLY_FIREWALL_ACTION],
    }
}

/// Whether `role` may invoke the named tool.
pub fn is_permitted(role: AgentRole, tool: &str) -> bool {
    permitted_tools(role).contains(&tool)
}
