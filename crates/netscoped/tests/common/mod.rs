//! Shared harness for workflow integration tests: a workflow wired entirely
//! to fakes, with handles kept for assertions.

#![allow(dead_code)]

use std::sync::Arc;

use netscope_common::{Endpoint, FirewallAction, ToolRequest, TrafficSpec};
use netscoped::cloud::fakes::{FakeFirewall, FakeFlowLogStore, FakeInventory, FakeReachability};
use netscoped::oracle::FakeOracle;
use netscoped::workflow::TroubleshootingWorkflow;

pub struct TestHarness {
    pub workflow: TroubleshootingWorkflow,
    pub inventory: Arc<FakeInventory>,
    pub reachability: Arc<FakeReachability>,
    pub flow_logs: Arc<FakeFlowLogStore>,
    pub firewall: Arc<FakeFirewall>,
    pub oracle: Arc<FakeOracle>,
}

pub struct HarnessBuilder {
    oracle: FakeOracle,
    inventory: FakeInventory,
    reachability: FakeReachability,
    flow_logs: FakeFlowLogStore,
    firewall: FakeFirewall,
}

impl HarnessBuilder {
    pub fn new(oracle: FakeOracle) -> Self {
        Self {
            oracle,
            inventory: FakeInventory::builder().build(),
            reachability: FakeReachability::reachable(),
            flow_logs: FakeFlowLogStore::builder().build(),
            firewall: FakeFirewall::succeeding(),
        }
    }

    pub fn inventory(mut self, inventory: FakeInventory) -> Self {
        self.inventory = inventory;
        self
    }

    pub fn reachability(mut self, reachability: FakeReachability) -> Self {
        self.reachability = reachability;
        self
    }

    pub fn flow_logs(mut self, flow_logs: FakeFlowLogStore) -> Self {
        self.flow_logs = flow_logs;
        self
    }

    pub fn firewall(mut self, firewall: FakeFirewall) -> Self {
        self.firewall = firewall;
        self
    }

    pub fn build(self) -> TestHarness {
        let oracle = Arc::new(self.oracle);
        let inventory = Arc::new(self.inventory);
        let reachability = Arc::new(self.reachability);
        let flow_logs = Arc::new(self.flow_logs);
        let firewall = Arc::new(self.firewall);

        let workflow = TroubleshootingWorkflow::new(
            oracle.clone(),
            inventory.clone(),
            reachability.clone(),
            flow_logs.clone(),
            firewall.clone(),
            vec!["google-managed-services".to_string()],
        );

        TestHarness { workflow, inventory, reachability, flow_logs, firewall, oracle }
    }
}

/// A concrete proposed fix used across scenarios.
pub fn sample_action() -> FirewallAction {
    FirewallAction {
        project_id: "proj-host".to_string(),
        verb: "CREATE".to_string(),
        rule_name: "allow-443-from-clients".to_string(),
        network: Some("shared-vpc".to_string()),
        direction: Some("INGRESS".to_string()),
        priority: Some(1000),
        target_tags: vec![],
        source_ranges: vec!["10.0.0.0/8".to_string()],
        allowed: vec![TrafficSpec { protocol: "tcp".to_string(), ports: vec!["443".to_string()] }],
        denied: vec![],
    }
}

/// A reachability probe request between the scenario endpoints.
pub fn probe_request() -> ToolRequest {
    ToolRequest::ProbeReachability {
        project_id: "proj-a".to_string(),
        source: Endpoint::ip("10.0.0.1"),
        destination: Endpoint::ip_port("10.0.0.2", 443),
        protocol: "TCP".to_string(),
    }
}
