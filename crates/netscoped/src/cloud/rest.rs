//! Thin REST implementations of the cloud traits.
//!
//! Each method is one managed-API call plus JSON mapping; all judgment about
//! what the responses mean lives with the callers. Authentication is a bearer
//! token handed in at construction (read from the environment by `main`).

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

use netscope_common::{
    Endpoint, FirewallAction, FlowLogRecord, NetscopeError, ProjectRef, RuleVerb,
};

use super::{
    FirewallApi, FlowLogStore, MutationOutcome, RawTestOutcome, ReachabilitySpec,
    ReachabilityService, Resource, ResourceInventory,
};

const HTTP_TIMEOUT_SECS: u64 = 30;

/// Reachability evaluations routinely take tens of seconds.
const REACHABILITY_POLL_INTERVAL_SECS: u64 = 2;
const REACHABILITY_WAIT_TIMEOUT_SECS: u64 = 120;

/// Firewall operations normally settle within a few seconds.
const OPERATION_POLL_INTERVAL_SECS: u64 = 1;
const OPERATION_WAIT_TIMEOUT_SECS: u64 = 60;

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .unwrap_or_default()
}

fn authorize(req: reqwest::RequestBuilder, token: &Option<String>) -> reqwest::RequestBuilder {
    match token {
        Some(token) => req.bearer_auth(token),
        None => req,
    }
}

/// Decode a response, folding HTTP-level failures into the given error kind.
async fn json_or_error(
    response: reqwest::Response,
    wrap: impl Fn(String) -> NetscopeError,
) -> Result<Value, NetscopeError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(wrap(format!("HTTP {}: {}", status, body)));
    }
    response.json::<Value>().await.map_err(|e| wrap(e.to_string()))
}

/// Collect list items from either a plain or an aggregated list response.
/// Aggregated responses nest per-scope objects each holding one array field.
fn collect_items(body: &Value) -> Vec<Value> {
    let mut items = Vec::new();
    match body.get("items") {
        Some(Value::Array(list)) => items.extend(list.iter().cloned()),
        Some(Value::Object(scopes)) => {
            for scoped in scopes.values() {
                if let Some(obj) = scoped.as_object() {
                    for field in obj.values() {
                        if let Some(list) = field.as_array() {
                            items.extend(list.iter().cloned());
                        }
                    }
                }
            }
        }
        _ => {}
    }
    items
}

fn to_resource(kind: &str, item: Value) -> Resource {
    let name = item.get("name").and_then(|n| n.as_str()).unwrap_or("<unnamed>").to_string();
    let location = item
        .get("region")
        .or_else(|| item.get("zone"))
        .and_then(|l| l.as_str())
        .map(|l| l.rsplit('/').next().unwrap_or(l).to_string());
    Resource { kind: kind.to_string(), name, location, attributes: item }
}

// ============================================================================
// Resource inventory
// ============================================================================

pub struct RestInventory {
    client: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl RestInventory {
    pub fn new(base: &str, token: Option<String>) -> Self {
        Self { client: http_client(), base: base.trim_end_matches('/').to_string(), token }
    }

    fn kind_path(kind: &str) -> Option<&'static str> {
        match kind {
            "compute.Network" => Some("global/networks"),
            "compute.Subnetwork" => Some("aggregated/subnetworks"),
            "compute.ForwardingRule" => Some("aggregated/forwardingRules"),
            "compute.BackendService" => Some("global/backendServices"),
            "compute.InterconnectAttachment" => Some("aggregated/interconnectAttachments"),
            "compute.Instance" => Some("aggregated/instances"),
            _ => None,
        }
    }
}

#[async_trait]
impl ResourceInventory for RestInventory {
    async fn list_resources(
        &self,
        project: &str,
        kind: &str,
    ) -> Result<Vec<Resource>, NetscopeError> {
        let path = Self::kind_path(kind)
            .ok_or_else(|| NetscopeError::Inventory(format!("unsupported resource kind `{}`", kind)))?;
        let url = format!("{}/projects/{}/{}?maxResults=200", self.base, project, path);

        let response = authorize(self.client.get(&url), &self.token)
            .send()
            .await
            .map_err(|e| NetscopeError::Inventory(e.to_string()))?;
        let body = json_or_error(response, NetscopeError::Inventory).await?;

        Ok(collect_items(&body).into_iter().map(|item| to_resource(kind, item)).collect())
    }

    async fn shared_vpc_host(&self, project: &str) -> Result<Option<ProjectRef>, NetscopeError> {
        let url = format!("{}/projects/{}/getXpnHost", self.base, project);
        let response = authorize(self.client.get(&url), &self.token)
            .send()
            .await
            .map_err(|e| NetscopeError::Inventory(e.to_string()))?;

        // A project without a host answers 404.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = json_or_error(response, NetscopeError::Inventory).await?;
        let host = body.get("name").and_then(|n| n.as_str()).unwrap_or_default();
        if host.is_empty() || host == project {
            return Ok(None);
        }
        Ok(Some(host.to_string()))
    }

    async fn usable_subnetworks(&self, project: &str) -> Result<Vec<Resource>, NetscopeError> {
        let url = format!("{}/projects/{}/aggregated/subnetworks/listUsable", self.base, project);
        let response = authorize(self.client.get(&url), &self.token)
            .send()
            .await
            .map_err(|e| NetscopeError::Inventory(e.to_string()))?;
        let body = json_or_error(response, NetscopeError::Inventory).await?;

        Ok(collect_items(&body)
            .into_iter()
            .map(|item| to_resource("compute.UsableSubnetwork", item))
            .collect())
    }
}

// ============================================================================
// Reachability test service
// ============================================================================

pub struct RestReachability {
    client: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl RestReachability {
    pub fn new(base: &str, token: Option<String>) -> Self {
        Self { client: http_client(), base: base.trim_end_matches('/').to_string(), token }
    }

    fn endpoint_json(endpoint: &Endpoint) -> Value {
        let mut fields = serde_json::Map::new();
        if let Some(ip) = &endpoint.ip {
            fields.insert("ipAddress".to_string(), Value::String(ip.clone()));
        }
        if let Some(instance) = &endpoint.instance {
            fields.insert("instance".to_string(), Value::String(instance.clone()));
        }
        if let Some(port) = endpoint.port {
            fields.insert("port".to_string(), Value::Number(port.into()));
        }
        Value::Object(fields)
    }
}

#[async_trait]
impl ReachabilityService for RestReachability {
    async fn create_test(&self, spec: &ReachabilitySpec) -> Result<String, NetscopeError> {
        let test_id = format!("netscope-{}", Uuid::new_v4().simple());
        let name = format!(
            "projects/{}/locations/global/connectivityTests/{}",
            spec.project_id, test_id
        );
        let url = format!(
            "{}/projects/{}/locations/global/connectivityTests?testId={}",
            self.base, spec.project_id, test_id
        );
        let body = serde_json::json!({
            "name": name,
            "source": Self::endpoint_json(&spec.source),
            "destination": Self::endpoint_json(&spec.destination),
            "protocol": spec.protocol,
        });

        let response = authorize(self.client.post(&url), &self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| NetscopeError::Reachability(e.to_string()))?;
        json_or_error(response, NetscopeError::Reachability).await?;

        Ok(name)
    }

    async fn wait_result(&self, test_id: &str) -> Result<RawTestOutcome, NetscopeError> {
        let url = format!("{}/{}", self.base, test_id);
        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(REACHABILITY_WAIT_TIMEOUT_SECS);

        loop {
            let response = authorize(self.client.get(&url), &self.token)
                .send()
                .await
                .map_err(|e| NetscopeError::Reachability(e.to_string()))?;
            let body = json_or_error(response, NetscopeError::Reachability).await?;

            if let Some(details) = body.get("reachabilityDetails") {
                let verdict = details
                    .get("result")
                    .and_then(|r| r.as_str())
                    .unwrap_or("RESULT_UNSPECIFIED")
                    .to_string();
                let mut trace = Vec::new();
                if let Some(traces) = details.get("traces").and_then(|t| t.as_array()) {
                    for path in traces {
                        if let Some(steps) = path.get("steps").and_then(|s| s.as_array()) {
                            trace.extend(steps.iter().cloned());
                        }
                    }
                }
                let error = details
                    .get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(|m| m.as_str())
                    .map(|m| m.to_string());
                return Ok(RawTestOutcome { verdict, trace, error });
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(NetscopeError::Reachability(format!(
                    "timed out after {}s waiting for test `{}` to evaluate",
                    REACHABILITY_WAIT_TIMEOUT_SECS, test_id
                )));
            }
            tokio::time::sleep(Duration::from_secs(REACHABILITY_POLL_INTERVAL_SECS)).await;
        }
    }

    async fn delete_test(&self, test_id: &str) -> Result<(), NetscopeError> {
        let url = format!("{}/{}", self.base, test_id);
        let response = authorize(self.client.delete(&url), &self.token)
            .send()
            .await
            .map_err(|e| NetscopeError::Reachability(e.to_string()))?;
        json_or_error(response, NetscopeError::Reachability).await?;
        Ok(())
    }
}

// ============================================================================
// Flow log store
// ============================================================================

pub struct RestFlowLogStore {
    client: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl RestFlowLogStore {
    pub fn new(base: &str, token: Option<String>) -> Self {
        Self { client: http_client(), base: base.trim_end_matches('/').to_string(), token }
    }

    fn protocol_name(raw: Option<&Value>) -> String {
        match raw {
            Some(Value::Number(n)) => match n.as_u64() {
                Some(1) => "ICMP".to_string(),
                Some(6) => "TCP".to_string(),
                Some(17) => "UDP".to_string(),
                Some(other) => other.to_string(),
                None => "UNKNOWN".to_string(),
            },
            Some(Value::String(s)) => s.clone(),
            _ => "UNKNOWN".to_string(),
        }
    }

    fn to_record(project: &str, entry: &Value) -> Option<FlowLogRecord> {
        let payload = entry.get("jsonPayload")?;
        let connection = payload.get("connection")?;
        let timestamp = entry
            .get("timestamp")
            .and_then(|t| t.as_str())
            .and_then(|t| t.parse().ok())?;

        Some(FlowLogRecord {
            timestamp,
            src_ip: connection.get("src_ip")?.as_str()?.to_string(),
            src_port: connection.get("src_port").and_then(|p| p.as_u64()).unwrap_or(0) as u16,
            dst_ip: connection.get("dest_ip")?.as_str()?.to_string(),
            dst_port: connection.get("dest_port").and_then(|p| p.as_u64()).unwrap_or(0) as u16,
            protocol: Self::protocol_name(connection.get("protocol")),
            bytes_sent: payload.get("bytes_sent").and_then(|b| b.as_u64()).unwrap_or(0),
            rtt_msec: payload.get("rtt_msec").and_then(|r| r.as_u64()),
            source_dataset_project: project.to_string(),
            subnetwork: entry
                .pointer("/resource/labels/subnetwork_name")
                .and_then(|s| s.as_str())
                .map(|s| s.to_string()),
        })
    }
}

#[async_trait]
impl FlowLogStore for RestFlowLogStore {
    async fn query_flows(
        &self,
        project: &str,
        src_ip: &str,
        dst_ip: &str,
        lookback_hours: u32,
        limit: usize,
    ) -> Result<Vec<FlowLogRecord>, NetscopeError> {
        let since = (Utc::now() - ChronoDuration::hours(i64::from(lookback_hours))).to_rfc3339();
        let filter = format!(
            "logName=\"projects/{p}/logs/compute.googleapis.com%2Fvpc_flows\" \
             AND timestamp >= \"{since}\" \
             AND ((jsonPayload.connection.src_ip=\"{src}\" AND jsonPayload.connection.dest_ip=\"{dst}\") \
              OR (jsonPayload.connection.src_ip=\"{dst}\" AND jsonPayload.connection.dest_ip=\"{src}\"))",
            p = project,
            since = since,
            src = src_ip,
            dst = dst_ip,
        );
        let body = serde_json::json!({
            "resourceNames": [format!("projects/{}", project)],
            "filter": filter,
            "orderBy": "timestamp desc",
            "pageSize": limit,
        });

        let url = format!("{}/entries:list", self.base);
        let response = authorize(self.client.post(&url), &self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| NetscopeError::FlowLog(e.to_string()))?;
        let body = json_or_error(response, NetscopeError::FlowLog).await?;

        let entries = body.get("entries").and_then(|e| e.as_array()).cloned().unwrap_or_default();
        Ok(entries.iter().filter_map(|entry| Self::to_record(project, entry)).collect())
    }
}

// ============================================================================
// Firewall mutation API
// ============================================================================

pub struct RestFirewall {
    client: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl RestFirewall {
    pub fn new(base: &str, token: Option<String>) -> Self {
        Self { client: http_client(), base: base.trim_end_matches('/').to_string(), token }
    }

    fn rule_body(action: &FirewallAction) -> Value {
        let traffic = |specs: &[netscope_common::TrafficSpec]| {
            specs
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "IPProtocol": s.protocol,
                        "ports": s.ports,
                    })
                })
                .collect::<Vec<_>>()
        };

        let mut body = serde_json::Map::new();
        body.insert("name".to_string(), Value::String(action.rule_name.clone()));
        if let Some(network) = &action.network {
            body.insert("network".to_string(), Value::String(network.clone()));
        }
        if let Some(direction) = &action.direction {
            body.insert("direction".to_string(), Value::String(direction.clone()));
        }
        if let Some(priority) = action.priority {
            body.insert("priority".to_string(), Value::Number(priority.into()));
        }
        if !action.target_tags.is_empty() {
            body.insert("targetTags".to_string(), serde_json::json!(action.target_tags));
        }
        if !action.source_ranges.is_empty() {
            body.insert("sourceRanges".to_string(), serde_json::json!(action.source_ranges));
        }
        if !action.allowed.is_empty() {
            body.insert("allowed".to_string(), Value::Array(traffic(&action.allowed)));
        }
        if !action.denied.is_empty() {
            body.insert("denied".to_string(), Value::Array(traffic(&action.denied)));
        }
        Value::Object(body)
    }

    /// Poll the returned operation until DONE. A timeout is not an error:
    /// the mutation was accepted, completion just was not observed.
    async fn wait_operation(
        &self,
        project: &str,
        operation: &Value,
    ) -> Result<MutationOutcome, NetscopeError> {
        let op_name = match operation.get("name").and_then(|n| n.as_str()) {
            Some(name) => name.to_string(),
            None => {
                return Ok(MutationOutcome {
                    completed: false,
                    message: "mutation accepted; no operation handle returned".to_string(),
                })
            }
        };
        let url = format!("{}/projects/{}/global/operations/{}", self.base, project, op_name);
        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(OPERATION_WAIT_TIMEOUT_SECS);

        loop {
            let response = authorize(self.client.get(&url), &self.token)
                .send()
                .await
                .map_err(|e| NetscopeError::Mutation(e.to_string()))?;
            let body = json_or_error(response, NetscopeError::Mutation).await?;

            if body.get("status").and_then(|s| s.as_str()) == Some("DONE") {
                if let Some(error) = body.pointer("/error/errors/0/message").and_then(|m| m.as_str())
                {
                    return Err(NetscopeError::Mutation(error.to_string()));
                }
                return Ok(MutationOutcome {
                    completed: true,
                    message: format!("operation `{}` completed", op_name),
                });
            }

            if tokio::time::Instant::now() >= deadline {
                return Ok(MutationOutcome {
                    completed: false,
                    message: format!(
                        "operation `{}` still running after {}s; completion not observed",
                        op_name, OPERATION_WAIT_TIMEOUT_SECS
                    ),
                });
            }
            tokio::time::sleep(Duration::from_secs(OPERATION_POLL_INTERVAL_SECS)).await;
        }
    }
}

#[async_trait]
impl FirewallApi for RestFirewall {
    async fn apply(&self, action: &FirewallAction) -> Result<MutationOutcome, NetscopeError> {
        let verb = RuleVerb::parse(&action.verb)
            .ok_or_else(|| NetscopeError::Mutation(format!("unrecognized verb `{}`", action.verb)))?;

        let firewalls = format!("{}/projects/{}/global/firewalls", self.base, action.project_id);
        let request = match verb {
            RuleVerb::Create => self.client.post(&firewalls).json(&Self::rule_body(action)),
            RuleVerb::Update => self
                .client
                .patch(format!("{}/{}", firewalls, action.rule_name))
                .json(&Self::rule_body(action)),
            RuleVerb::Delete => self.client.delete(format!("{}/{}", firewalls, action.rule_name)),
        };

        let response = authorize(request, &self.token)
            .send()
            .await
            .map_err(|e| NetscopeError::Mutation(e.to_string()))?;
        let operation = json_or_error(response, NetscopeError::Mutation).await?;

        self.wait_operation(&action.project_id, &operation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_items_handles_plain_and_aggregated_shapes() {
        let plain = serde_json::json!({"items": [{"name": "a"}, {"name": "b"}]});
        assert_eq!(collect_items(&plain).len(), 2);

        let aggregated = serde_json::json!({
            "items": {
                "regions/us-central1": {"subnetworks": [{"name": "a"}]},
                "regions/eu-west1": {"subnetworks": [{"name": "b"}, {"name": "c"}]}
            }
        });
        assert_eq!(collect_items(&aggregated).len(), 3);

        assert!(collect_items(&serde_json::json!({})).is_empty());
    }

    #[test]
    fn flow_entries_map_onto_records() {
        let entry = serde_json::json!({
            "timestamp": "2026-07-01T10:00:00Z",
            "jsonPayload": {
                "connection": {
                    "src_ip": "10.0.0.1", "src_port": 54321,
                    "dest_ip": "10.0.0.2", "dest_port": 443,
                    "protocol": 6
                },
                "bytes_sent": 1200,
                "rtt_msec": 4
            },
            "resource": {"labels": {"subnetwork_name": "snet-1"}}
        });

        let record = RestFlowLogStore::to_record("p1", &entry).unwrap();
        assert_eq!(record.protocol, "TCP");
        assert_eq!(record.dst_port, 443);
        assert_eq!(record.source_dataset_project, "p1");
        assert_eq!(record.subnetwork.as_deref(), Some("snet-1"));
    }

    #[test]
    fn rule_body_strips_unset_fields() {
        let action = FirewallAction {
            project_id: "p1".to_string(),
            verb: "CREATE".to_string(),
            rule_name: "allow-hc".to_string(),
            network: None,
            direction: Some("INGRESS".to_string()),
            priority: None,
            target_tags: vec![],
            source_ranges: vec!["130.211.0.0/22".to_string()],
            allowed: vec![netscope_common::TrafficSpec {
                protocol: "tcp".to_string(),
                ports: vec!["80".to_string()],
            }],
            denied: vec![],
        };

        let body = RestFirewall::rule_body(&action);
        assert!(body.get("network").is_none());
        assert!(body.get("priority").is_none());
        assert_eq!(body["direction"], "INGRESS");
        assert_eq!(body["allowed"][0]["IPProtocol"], "tcp");
    }
}
