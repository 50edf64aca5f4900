//! Project scope discovery.
//!
//! Finds the projects whose networking resources participate in a
//! connectivity path: Shared-VPC hosts, peered networks, interconnect
//! attachments, load-balancer backends. Discovery is breadth-first with a
//! fixed depth of 1 - roots are scanned, discovered projects are recorded but
//! not recursively scanned, so a run can never fan out across an entire
//! organization.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use netscope_common::{
    extract::exclusion_set, extract_project_ids, DiscoveredScope, ProjectRef, ScopeEdge,
};

use crate::cloud::ResourceInventory;

/// Resource kinds scanned per project, in fixed catalog order.
pub const RESOURCE_KIND_CATALOG: &[&str] = &[
    "compute.Network",
    "compute.Subnetwork",
    "compute.ForwardingRule",
    "compute.BackendService",
    "compute.InterconnectAttachment",
    "compute.Instance",
];

/// A non-fatal failure for one resource kind during a project scan.
#[derive(Debug, Clone)]
pub struct ScanError {
    pub kind: String,
    pub message: String,
}

/// Everything one project scan produced.
#[derive(Debug, Clone, Default)]
pub struct ProjectScan {
    pub refs: BTreeSet<ProjectRef>,
    pub edges: Vec<ScopeEdge>,
    pub errors: Vec<ScanError>,
}

/// Walk a JSON attribute bag collecting every string field with its dotted
/// path, so extraction can report which field produced a reference.
fn collect_strings(value: &serde_json::Value, path: &str, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::String(s) => out.push((path.to_string(), s.clone())),
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                let child_path =
                    if path.is_empty() { key.clone() } else { format!("{}.{}", path, key) };
                collect_strings(child, &child_path, out);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_strings(item, path, out);
            }
        }
        _ => {}
    }
}

/// Scans one project's inventory and extracts outbound project references.
pub struct ResourceGraphProbe {
    inventory: Arc<dyn ResourceInventory>,
    deny_list: Vec<String>,
}

impl ResourceGraphProbe {
    pub fn new(inventory: Arc<dyn ResourceInventory>, deny_list: Vec<String>) -> Self {
        Self { inventory, deny_list }
    }

    /// Scan `project`. `extra_exclude` carries ids that must not surface as
    /// targets beyond the project itself and the deny list (the discoverer
    /// passes the full root set here).
    pub async fn scan(&self, project: &str, extra_exclude: &BTreeSet<ProjectRef>) -> ProjectScan {
        let mut exclude = exclusion_set(project, self.deny_list.iter());
        exclude.extend(extra_exclude.iter().cloned());

        let mut scan = ProjectScan::default();

        for kind in RESOURCE_KIND_CATALOG {
            match self.inventory.list_resources(project, kind).await {
                Ok(resources) => {
                    for resource in &resources {
                        self.extract_edges(
                            project,
                            kind,
                            &resource.name,
                            &resource.attributes,
                            &exclude,
                            &mut scan,
                        );
                    }
                }
                Err(e) => {
                    warn!("  Scan of {} in `{}` failed: {}", kind, project, e);
                    scan.errors.push(ScanError { kind: kind.to_string(), message: e.to_string() });
                }
            }
        }

        match self.inventory.shared_vpc_host(project).await {
            Ok(Some(host)) if !exclude.contains(&host) => {
                scan.refs.insert(host.clone());
                scan.edges.push(ScopeEdge {
                    source: project.to_string(),
                    target: host,
                    reason: format!("Shared VPC host for service project `{}`", project),
                });
            }
            Ok(_) => {}
            Err(e) => {
                warn!("  Shared VPC host lookup for `{}` failed: {}", project, e);
                scan.errors
                    .push(ScanError { kind: "sharedVpcHost".to_string(), message: e.to_string() });
            }
        }

        match self.inventory.usable_subnetworks(project).await {
            Ok(subnets) => {
                for subnet in &subnets {
                    self.extract_edges(
                        project,
                        "usable subnetwork",
                        &subnet.name,
                        &subnet.attributes,
                        &exclude,
                        &mut scan,
                    );
                }
            }
            Err(e) => {
                warn!("  Usable subnetwork listing for `{}` failed: {}", project, e);
                scan.errors.push(ScanError {
                    kind: "usableSubnetworks".to_string(),
                    message: e.to_string(),
                });
            }
        }

        debug!(
            "  Scanned `{}`: {} outbound reference(s), {} error(s)",
            project,
            scan.refs.len(),
            scan.errors.len()
        );
        scan
    }

    fn extract_edges(
        &self,
        project: &str,
        kind: &str,
        name: &str,
        attributes: &serde_json::Value,
        exclude: &BTreeSet<ProjectRef>,
        scan: &mut ProjectScan,
    ) {
        let mut fields = Vec::new();
        collect_strings(attributes, "", &mut fields);

        for (path, text) in &fields {
            for id in extract_project_ids(text, exclude) {
                scan.refs.insert(id.clone());
                scan.edges.push(ScopeEdge {
                    source: project.to_string(),
                    target: id.clone(),
                    reason: format!(
                        "{} `{}` field `{}` references project `{}`",
                        kind, name, path, id
                    ),
                });
            }
        }
    }
}

/// Drives the probe over the root frontier.
pub struct ScopeDiscoverer {
    probe: ResourceGraphProbe,
}

impl ScopeDiscoverer {
    pub fn new(probe: ResourceGraphProbe) -> Self {
        Self { probe }
    }

    /// Scan every root once, in input order. Discovered projects join the
    /// scope but are not themselves scanned; the frontier is exactly `roots`,
    /// which guarantees termination.
    pub async fn discover(&self, roots: &[ProjectRef]) -> DiscoveredScope {
        let root_set: BTreeSet<ProjectRef> = roots.iter().cloned().collect();
        let mut scanned: BTreeSet<ProjectRef> = BTreeSet::new();
        let mut scope = DiscoveredScope::new();

        for root in roots {
            if !scanned.insert(root.clone()) {
                continue;
            }
            scope.insert(root);

            let scan = self.probe.scan(root, &root_set).await;
            for edge in &scan.edges {
                scope.add_edge(&edge.source, &edge.target, &edge.reason);
            }
            for error in &scan.errors {
                debug!("  Partial scan error in `{}` ({}): {}", root, error.kind, error.message);
            }
        }

        scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::fakes::{resource, FakeInventory};
    use netscope_common::extract::DEFAULT_PROJECT_DENY_LIST;

    fn probe(inventory: Arc<FakeInventory>) -> ResourceGraphProbe {
        let deny = DEFAULT_PROJECT_DENY_LIST.iter().map(|s| s.to_string()).collect();
        ResourceGraphProbe::new(inventory, deny)
    }

    #[tokio::test]
    async fn shared_vpc_host_becomes_an_edge() {
        let inventory = Arc::new(FakeInventory::builder().shared_vpc_host("proj-a", "proj-b").build());
        let discoverer = ScopeDiscoverer::new(probe(inventory));

        let scope = discoverer.discover(&["proj-a".to_string()]).await;

        let expected: BTreeSet<String> =
            ["proj-a".to_string(), "proj-b".to_string()].into_iter().collect();
        assert_eq!(scope.visited, expected);
        assert_eq!(scope.edges.len(), 1);
        assert_eq!(scope.edges[0].source, "proj-a");
        assert_eq!(scope.edges[0].target, "proj-b");
        assert!(scope.edges[0].reason.contains("Shared VPC"));
    }

    #[tokio::test]
    async fn subnetwork_reference_is_extracted_with_field_provenance() {
        let inventory = Arc::new(
            FakeInventory::builder()
                .resource(
                    "proj-a",
                    resource(
                        "compute.Subnetwork",
                        "snet-1",
                        serde_json::json!({
                            "network": "https://www.googleapis.com/compute/v1/projects/proj-host/global/networks/shared"
                        }),
                    ),
                )
                .build(),
        );
        let discoverer = ScopeDiscoverer::new(probe(inventory));

        let scope = discoverer.discover(&["proj-a".to_string()]).await;

        assert!(scope.contains("proj-host"));
        assert_eq!(scope.edges.len(), 1);
        let edge = &scope.edges[0];
        assert!(edge.reason.contains("snet-1"));
        assert!(edge.reason.contains("network"));
        assert!(edge.reason.contains("proj-host"));
    }

    #[tokio::test]
    async fn one_failing_kind_does_not_abort_the_scan() {
        let inventory = Arc::new(
            FakeInventory::builder()
                .failing_kind("proj-a", "compute.Network", "permission denied")
                .resource(
                    "proj-a",
                    resource(
                        "compute.ForwardingRule",
                        "fr-1",
                        serde_json::json!({
                            "backendService": "projects/proj-lb/global/backendServices/bes"
                        }),
                    ),
                )
                .build(),
        );
        let graph_probe = probe(inventory);

        let scan = graph_probe.scan("proj-a", &BTreeSet::new()).await;

        assert_eq!(scan.errors.len(), 1);
        assert_eq!(scan.errors[0].kind, "compute.Network");
        assert!(scan.refs.contains("proj-lb"));
    }

    #[tokio::test]
    async fn discovery_is_depth_one() {
        // proj-b is discovered from proj-a but must not itself be scanned.
        let inventory = Arc::new(FakeInventory::builder().shared_vpc_host("proj-a", "proj-b").build());
        let discoverer = ScopeDiscoverer::new(probe(inventory.clone()));

        discoverer.discover(&["proj-a".to_string()]).await;

        let calls = inventory.calls();
        assert!(calls.iter().any(|c| c.starts_with("list:proj-a:")));
        assert!(!calls.iter().any(|c| c.contains("proj-b")));
    }

    #[tokio::test]
    async fn roots_never_appear_as_edge_targets() {
        let inventory = Arc::new(
            FakeInventory::builder()
                .resource(
                    "proj-a",
                    resource(
                        "compute.Network",
                        "net",
                        serde_json::json!({
                            "peerings": ["projects/proj-b/global/networks/other",
                                          "projects/proj-c/global/networks/third"]
                        }),
                    ),
                )
                .build(),
        );
        let discoverer = ScopeDiscoverer::new(probe(inventory));

        let roots = vec!["proj-a".to_string(), "proj-b".to_string()];
        let scope = discoverer.discover(&roots).await;

        for edge in &scope.edges {
            assert!(!roots.contains(&edge.target), "root surfaced as target: {:?}", edge);
        }
        assert!(scope.contains("proj-c"));
    }

    #[tokio::test]
    async fn deny_listed_ids_never_enter_the_scope() {
        let inventory = Arc::new(
            FakeInventory::builder()
                .resource(
                    "proj-a",
                    resource(
                        "compute.Network",
                        "net",
                        serde_json::json!({
                            "peerings": ["projects/google-managed-services/global/networks/psc",
                                          "projects/proj-real/global/networks/net"]
                        }),
                    ),
                )
                .build(),
        );
        let discoverer = ScopeDiscoverer::new(probe(inventory));

        let scope = discoverer.discover(&["proj-a".to_string()]).await;

        assert!(!scope.contains("google-managed-services"));
        assert!(scope.contains("proj-real"));
    }

    #[tokio::test]
    async fn repeated_discovery_yields_the_same_visited_set() {
        let inventory = Arc::new(
            FakeInventory::builder()
                .shared_vpc_host("proj-a", "proj-b")
                .resource(
                    "proj-a",
                    resource(
                        "compute.Subnetwork",
                        "snet",
                        serde_json::json!({"network": "projects/proj-b/global/networks/n"}),
                    ),
                )
                .build(),
        );
        let discoverer = ScopeDiscoverer::new(probe(inventory));

        let first = discoverer.discover(&["proj-a".to_string()]).await;
        let second = discoverer.discover(&["proj-a".to_string()]).await;

        assert_eq!(first.visited, second.visited);
        // Two distinct reasons for the same pair, both preserved, no triple
        // duplicated.
        assert_eq!(first.edges.len(), 2);
        let mut merged = first.clone();
        merged.merge(&second);
        assert_eq!(merged.edges.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_roots_are_scanned_once() {
        let inventory = Arc::new(FakeInventory::builder().shared_vpc_host("proj-a", "proj-b").build());
        let discoverer = ScopeDiscoverer::new(probe(inventory.clone()));

        discoverer.discover(&["proj-a".to_string(), "proj-a".to_string()]).await;

        let host_calls =
            inventory.calls().iter().filter(|c| c.as_str() == "host:proj-a").count();
        assert_eq!(host_calls, 1);
    }
}
