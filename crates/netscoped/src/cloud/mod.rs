//! Narrow interfaces to the managed cloud APIs.
//!
//! Everything the daemon asks a cloud provider to do goes through one of the
//! four traits below. Production code uses the REST implementations; tests
//! use the fakes, which record calls for assertions and never touch the
//! network.

pub mod fakes;
pub mod rest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use netscope_common::{Endpoint, FirewallAction, FlowLogRecord, NetscopeError, ProjectRef};

pub use fakes::{FakeFirewall, FakeFlowLogStore, FakeInventory, FakeReachability};
pub use rest::{RestFirewall, RestFlowLogStore, RestInventory, RestReachability};

/// One inventoried resource: kind, name, and the provider's raw attribute
/// bag. The bag is scanned for embedded project references, so it is kept
/// verbatim rather than mapped field by field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub attributes: serde_json::Value,
}

/// Read-only resource inventory for one project.
#[async_trait]
pub trait ResourceInventory: Send + Sync {
    /// List resources of one kind. A failure here is a partial-scan error,
    /// never fatal to the caller's scan.
    async fn list_resources(
        &self,
        project: &str,
        kind: &str,
    ) -> Result<Vec<Resource>, NetscopeError>;

    /// Direct Shared-VPC host lookup for a service project, where the
    /// provider supports it.
    async fn shared_vpc_host(&self, project: &str) -> Result<Option<ProjectRef>, NetscopeError>;

    /// Subnetworks this project may use, including ones owned by a host
    /// project.
    async fn usable_subnetworks(&self, project: &str) -> Result<Vec<Resource>, NetscopeError>;
}

/// Parameters of one active path test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReachabilitySpec {
    pub project_id: ProjectRef,
    pub source: Endpoint,
    pub destination: Endpoint,
    pub protocol: String,
}

/// Raw provider outcome before verdict mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTestOutcome {
    pub verdict: String,
    /// Hop steps, in path order, as reported.
    pub trace: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The reachability test service. Tests are ephemeral: create, wait, delete.
#[async_trait]
pub trait ReachabilityService: Send + Sync {
    /// Create a test resource; returns its identifier.
    async fn create_test(&self, spec: &ReachabilitySpec) -> Result<String, NetscopeError>;

    /// Block until the asynchronous evaluation completes and return the raw
    /// outcome. May take tens of seconds.
    async fn wait_result(&self, test_id: &str) -> Result<RawTestOutcome, NetscopeError>;

    /// Delete the test resource. Called on every probe exit path.
    async fn delete_test(&self, test_id: &str) -> Result<(), NetscopeError>;
}

/// Passive traffic-log store.
#[async_trait]
pub trait FlowLogStore: Send + Sync {
    /// Query records for the IP pair in either direction within the lookback
    /// window. Implementations match (src,dst) and (dst,src).
    async fn query_flows(
        &self,
        project: &str,
        src_ip: &str,
        dst_ip: &str,
        lookback_hours: u32,
        limit: usize,
    ) -> Result<Vec<FlowLogRecord>, NetscopeError>;
}

/// Outcome of one mutation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationOutcome {
    /// Whether a completion signal was observed for the underlying
    /// operation.
    pub completed: bool,
    pub message: String,
}

/// The mutating firewall surface. The only write path in the system.
#[async_trait]
pub trait FirewallApi: Send + Sync {
    async fn apply(&self, action: &FirewallAction) -> Result<MutationOutcome, NetscopeError>;
}
