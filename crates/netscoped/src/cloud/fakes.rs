//! Deterministic fakes for the cloud traits.
//!
//! Production code never constructs these; tests do, via the builders. Each
//! fake records its calls so tests can assert on call counts and captured
//! arguments without touching the network.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use netscope_common::{FirewallAction, FlowLogRecord, NetscopeError, ProjectRef};

use super::{
    FirewallApi, FlowLogStore, MutationOutcome, RawTestOutcome, ReachabilitySpec,
    ReachabilityService, Resource, ResourceInventory,
};

/// Shorthand for a resource whose attributes are a JSON object.
pub fn resource(kind: &str, name: &str, attributes: serde_json::Value) -> Resource {
    Resource { kind: kind.to_string(), name: name.to_string(), location: None, attributes }
}

// ============================================================================
// Fake resource inventory
// ============================================================================

#[derive(Default)]
pub struct FakeInventory {
    resources: HashMap<(String, String), Vec<Resource>>,
    failing_kinds: HashMap<(String, String), String>,
    hosts: HashMap<String, ProjectRef>,
    usable: HashMap<String, Vec<Resource>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeInventory {
    pub fn builder() -> FakeInventoryBuilder {
        FakeInventoryBuilder::default()
    }

    /// Calls recorded as "method:project[:kind]".
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[derive(Default)]
pub struct FakeInventoryBuilder {
    inner: FakeInventory,
}

impl FakeInventoryBuilder {
    pub fn resource(mut self, project: &str, res: Resource) -> Self {
        self.inner
            .resources
            .entry((project.to_string(), res.kind.clone()))
            .or_default()
            .push(res);
        self
    }

    pub fn failing_kind(mut self, project: &str, kind: &str, message: &str) -> Self {
        self.inner
            .failing_kinds
            .insert((project.to_string(), kind.to_string()), message.to_string());
        self
    }

    pub fn shared_vpc_host(mut self, project: &str, host: &str) -> Self {
        self.inner.hosts.insert(project.to_string(), host.to_string());
        self
    }

    pub fn usable_subnetwork(mut self, project: &str, res: Resource) -> Self {
        self.inner.usable.entry(project.to_string()).or_default().push(res);
        self
    }

    pub fn build(self) -> FakeInventory {
        self.inner
    }
}

#[async_trait]
impl ResourceInventory for FakeInventory {
    async fn list_resources(
        &self,
        project: &str,
        kind: &str,
    ) -> Result<Vec<Resource>, NetscopeError> {
        self.record(format!("list:{}:{}", project, kind));
        let key = (project.to_string(), kind.to_string());
        if let Some(message) = self.failing_kinds.get(&key) {
            return Err(NetscopeError::Inventory(message.clone()));
        }
        Ok(self.resources.get(&key).cloned().unwrap_or_default())
    }

    async fn shared_vpc_host(&self, project: &str) -> Result<Option<ProjectRef>, NetscopeError> {
        self.record(format!("host:{}", project));
        Ok(self.hosts.get(project).cloned())
    }

    async fn usable_subnetworks(&self, project: &str) -> Result<Vec<Resource>, NetscopeError> {
        self.record(format!("usable:{}", project));
        Ok(self.usable.get(project).cloned().unwrap_or_default())
    }
}

// ============================================================================
// Fake reachability service
// ============================================================================

pub struct FakeReachability {
    outcomes: Mutex<VecDeque<RawTestOutcome>>,
    create_error: Option<String>,
    wait_error: Option<String>,
    delete_error: Option<String>,
    /// Artificial evaluation latency, for cancellation tests.
    wait_delay: Option<Duration>,
    specs: Arc<Mutex<Vec<ReachabilitySpec>>>,
    deleted: Arc<Mutex<Vec<String>>>,
    counts: Arc<Mutex<HashMap<&'static str, usize>>>,
}

impl Default for FakeReachability {
    fn default() -> Self {
        Self::reachable()
    }
}

impl FakeReachability {
    fn empty() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            create_error: None,
            wait_error: None,
            delete_error: None,
            wait_delay: None,
            specs: Arc::new(Mutex::new(Vec::new())),
            deleted: Arc::new(Mutex::new(Vec::new())),
            counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Every test evaluates REACHABLE through a two-hop trace.
    pub fn reachable() -> Self {
        Self::empty().with_outcome(RawTestOutcome {
            verdict: "REACHABLE".to_string(),
            trace: vec![
                serde_json::json!({"description": "start at instance `vm-src`"}),
                serde_json::json!({"description": "delivered to instance `vm-dst`"}),
            ],
            error: None,
        })
    }

    /// Every test evaluates UNREACHABLE, dropped by the named firewall rule.
    pub fn unreachable_by_rule(rule: &str) -> Self {
        Self::empty().with_outcome(RawTestOutcome {
            verdict: "UNREACHABLE".to_string(),
            trace: vec![
                serde_json::json!({"description": "start at instance `vm-src`"}),
                serde_json::json!({"description": format!("dropped by firewall rule `{}`", rule)}),
            ],
            error: None,
        })
    }

    /// Queue an outcome; the last queued outcome is repeated once the queue
    /// drains, so a single-outcome fake answers every probe.
    pub fn with_outcome(self, outcome: RawTestOutcome) -> Self {
        self.outcomes.lock().unwrap().push_back(outcome);
        self
    }

    pub fn failing_create(message: &str) -> Self {
        let mut fake = Self::empty();
        fake.create_error = Some(message.to_string());
        fake
    }

    pub fn failing_wait(message: &str) -> Self {
        let mut fake = Self::reachable();
        fake.wait_error = Some(message.to_string());
        fake
    }

    pub fn with_delete_error(mut self, message: &str) -> Self {
        self.delete_error = Some(message.to_string());
        self
    }

    pub fn with_wait_delay(mut self, delay: Duration) -> Self {
        self.wait_delay = Some(delay);
        self
    }

    pub fn create_count(&self) -> usize {
        *self.counts.lock().unwrap().get("create").unwrap_or(&0)
    }

    pub fn delete_count(&self) -> usize {
        *self.counts.lock().unwrap().get("delete").unwrap_or(&0)
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    /// Every spec passed to create_test, in order.
    pub fn specs(&self) -> Vec<ReachabilitySpec> {
        self.specs.lock().unwrap().clone()
    }

    fn bump(&self, key: &'static str) {
        *self.counts.lock().unwrap().entry(key).or_insert(0) += 1;
    }
}

#[async_trait]
impl ReachabilityService for FakeReachability {
    async fn create_test(&self, spec: &ReachabilitySpec) -> Result<String, NetscopeError> {
        self.bump("create");
        if let Some(message) = &self.create_error {
            return Err(NetscopeError::Reachability(message.clone()));
        }
        self.specs.lock().unwrap().push(spec.clone());
        let n = self.create_count();
        Ok(format!("fake-test-{}", n))
    }

    async fn wait_result(&self, _test_id: &str) -> Result<RawTestOutcome, NetscopeError> {
        self.bump("wait");
        if let Some(delay) = self.wait_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.wait_error {
            return Err(NetscopeError::Reachability(message.clone()));
        }
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.len() > 1 {
            Ok(outcomes.pop_front().expect("non-empty"))
        } else {
            outcomes
                .front()
                .cloned()
                .ok_or_else(|| NetscopeError::Reachability("no scripted outcome".to_string()))
        }
    }

    async fn delete_test(&self, test_id: &str) -> Result<(), NetscopeError> {
        self.bump("delete");
        self.deleted.lock().unwrap().push(test_id.to_string());
        if let Some(message) = &self.delete_error {
            return Err(NetscopeError::Reachability(message.clone()));
        }
        Ok(())
    }
}

// ============================================================================
// Fake flow log store
// ============================================================================

#[derive(Default)]
pub struct FakeFlowLogStore {
    records: HashMap<String, Vec<FlowLogRecord>>,
    failing: HashMap<String, String>,
    queried: Arc<Mutex<Vec<String>>>,
}

impl FakeFlowLogStore {
    pub fn builder() -> FakeFlowLogStoreBuilder {
        FakeFlowLogStoreBuilder::default()
    }

    pub fn queried_projects(&self) -> Vec<String> {
        self.queried.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct FakeFlowLogStoreBuilder {
    inner: FakeFlowLogStore,
}

impl FakeFlowLogStoreBuilder {
    pub fn records(mut self, project: &str, records: Vec<FlowLogRecord>) -> Self {
        self.inner.records.entry(project.to_string()).or_default().extend(records);
        self
    }

    pub fn failing(mut self, project: &str, message: &str) -> Self {
        self.inner.failing.insert(project.to_string(), message.to_string());
        self
    }

    pub fn build(self) -> FakeFlowLogStore {
        self.inner
    }
}

#[async_trait]
impl FlowLogStore for FakeFlowLogStore {
    async fn query_flows(
        &self,
        project: &str,
        _src_ip: &str,
        _dst_ip: &str,
        _lookback_hours: u32,
        limit: usize,
    ) -> Result<Vec<FlowLogRecord>, NetscopeError> {
        self.queried.lock().unwrap().push(project.to_string());
        if let Some(message) = self.failing.get(project) {
            return Err(NetscopeError::FlowLog(message.clone()));
        }
        let mut records = self.records.get(project).cloned().unwrap_or_default();
        records.truncate(limit);
        Ok(records)
    }
}

// ============================================================================
// Fake firewall
// ============================================================================

pub struct FakeFirewall {
    /// Scripted results; the default is a completed success.
    script: Mutex<VecDeque<Result<MutationOutcome, String>>>,
    applied: Arc<Mutex<Vec<FirewallAction>>>,
}

impl Default for FakeFirewall {
    fn default() -> Self {
        Self::succeeding()
    }
}

impl FakeFirewall {
    pub fn succeeding() -> Self {
        Self { script: Mutex::new(VecDeque::new()), applied: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn failing(message: &str) -> Self {
        let fake = Self::succeeding();
        fake.script.lock().unwrap().push_back(Err(message.to_string()));
        fake
    }

    /// Mutation is accepted but no completion signal is ever observed.
    pub fn without_completion() -> Self {
        let fake = Self::succeeding();
        fake.script.lock().unwrap().push_back(Ok(MutationOutcome {
            completed: false,
            message: "operation submitted".to_string(),
        }));
        fake
    }

    pub fn apply_count(&self) -> usize {
        self.applied.lock().unwrap().len()
    }

    pub fn applied_actions(&self) -> Vec<FirewallAction> {
        self.applied.lock().unwrap().clone()
    }
}

#[async_trait]
impl FirewallApi for FakeFirewall {
    async fn apply(&self, action: &FirewallAction) -> Result<MutationOutcome, NetscopeError> {
        self.applied.lock().unwrap().push(action.clone());
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(message)) => Err(NetscopeError::Mutation(message)),
            None => Ok(MutationOutcome {
                completed: true,
                message: format!("rule `{}` updated", action.rule_name),
            }),
        }
    }
}

// Keep the module self-checking: the fakes are themselves test infrastructure,
// so a broken fake shows up here rather than inside a workflow test.
#[cfg(test)]
mod tests {
    use super::*;
    use netscope_common::Endpoint;

    #[tokio::test]
    async fn inventory_records_calls_and_failures() {
        let inventory = FakeInventory::builder()
            .resource("p1", resource("compute.Network", "net", serde_json::json!({})))
            .failing_kind("p1", "compute.Instance", "quota exceeded")
            .build();

        let nets = inventory.list_resources("p1", "compute.Network").await.unwrap();
        assert_eq!(nets.len(), 1);

        let err = inventory.list_resources("p1", "compute.Instance").await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));

        assert_eq!(
            inventory.calls(),
            vec!["list:p1:compute.Network", "list:p1:compute.Instance"]
        );
    }

    #[tokio::test]
    async fn reachability_counts_creates_and_deletes() {
        let service = FakeReachability::reachable();
        let spec = ReachabilitySpec {
            project_id: "p1".to_string(),
            source: Endpoint::ip("10.0.0.1"),
            destination: Endpoint::ip_port("10.0.0.2", 443),
            protocol: "TCP".to_string(),
        };

        let id = service.create_test(&spec).await.unwrap();
        let outcome = service.wait_result(&id).await.unwrap();
        service.delete_test(&id).await.unwrap();

        assert_eq!(outcome.verdict, "REACHABLE");
        assert_eq!(service.create_count(), 1);
        assert_eq!(service.delete_count(), 1);
        assert_eq!(service.specs().len(), 1);
    }

    #[tokio::test]
    async fn firewall_defaults_to_completed_success() {
        let firewall = FakeFirewall::succeeding();
        let action = FirewallAction {
            project_id: "p1".to_string(),
            verb: "CREATE".to_string(),
            rule_name: "allow-ssh".to_string(),
            network: None,
            direction: None,
            priority: None,
            target_tags: vec![],
            source_ranges: vec![],
            allowed: vec![],
            denied: vec![],
        };

        let outcome = firewall.apply(&action).await.unwrap();
        assert!(outcome.completed);
        assert_eq!(firewall.apply_count(), 1);
    }
}
