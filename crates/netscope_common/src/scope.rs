//! Discovered project scope.
//!
//! The scope is a small directed graph: projects that were seen, and the
//! edges explaining why a project was pulled into the troubleshooting scope
//! (Shared VPC host, peering, interconnect, backend reference). The structure
//! is append-only within a discovery run: projects and edges are added, never
//! removed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Opaque cloud project identifier. Case-sensitive exact match, no
/// normalization.
pub type ProjectRef = String;

/// One directed cross-project reference, with a human-readable provenance
/// reason. Parallel edges with different reasons between the same pair are
/// expected and preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeEdge {
    pub source: ProjectRef,
    pub target: ProjectRef,
    pub reason: String,
}

/// The accumulated project graph for one discovery run.
///
/// Invariants maintained by the mutators:
/// - every edge `target` is also present in `visited`
/// - at most one edge per distinct (source, target, reason) triple
/// - `visited` only grows
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveredScope {
    pub visited: BTreeSet<ProjectRef>,
    pub edges: Vec<ScopeEdge>,
}

impl DiscoveredScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a project to the visited set. Returns true when the project was
    /// not seen before.
    pub fn insert(&mut self, project: &str) -> bool {
        self.visited.insert(project.to_string())
    }

    /// Record a cross-project edge. The target joins `visited`; the triple is
    /// deduplicated, so re-discovering the same relationship through the same
    /// code path is idempotent. Returns true when the edge was new.
    pub fn add_edge(&mut self, source: &str, target: &str, reason: &str) -> bool {
        self.visited.insert(target.to_string());
        let duplicate = self
            .edges
            .iter()
            .any(|e| e.source == source && e.target == target && e.reason == reason);
        if duplicate {
            return false;
        }
        self.edges.push(ScopeEdge {
            source: source.to_string(),
            target: target.to_string(),
            reason: reason.to_string(),
        });
        true
    }

    /// Fold another scope into this one, preserving both invariants.
    pub fn merge(&mut self, other: &DiscoveredScope) {
        for project in &other.visited {
            self.visited.insert(project.clone());
        }
        for edge in &other.edges {
            self.add_edge(&edge.source, &edge.target, &edge.reason);
        }
    }

    pub fn contains(&self, project: &str) -> bool {
        self.visited.contains(project)
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }

    /// Short human summary for evidence trails.
    pub fn summary(&self) -> String {
        format!(
            "{} project(s) in scope, {} cross-project reference(s)",
            self.visited.len(),
            self.edges.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_target_always_joins_visited() {
        let mut scope = DiscoveredScope::new();
        scope.insert("proj-a");
        scope.add_edge("proj-a", "proj-b", "Shared VPC host");

        assert!(scope.contains("proj-a"));
        assert!(scope.contains("proj-b"));
        for edge in &scope.edges {
            assert!(scope.visited.contains(&edge.target));
        }
    }

    #[test]
    fn duplicate_triples_are_dropped() {
        let mut scope = DiscoveredScope::new();
        assert!(scope.add_edge("a", "b", "peering"));
        assert!(!scope.add_edge("a", "b", "peering"));
        assert_eq!(scope.edges.len(), 1);
    }

    #[test]
    fn distinct_reasons_for_same_pair_are_kept() {
        let mut scope = DiscoveredScope::new();
        assert!(scope.add_edge("a", "b", "peering with network `net-1`"));
        assert!(scope.add_edge("a", "b", "Shared VPC host"));
        assert_eq!(scope.edges.len(), 2);
        assert_eq!(scope.visited.len(), 2);
    }

    #[test]
    fn insertion_order_of_edges_is_preserved() {
        let mut scope = DiscoveredScope::new();
        scope.add_edge("a", "c", "third");
        scope.add_edge("a", "b", "first");
        let reasons: Vec<&str> = scope.edges.iter().map(|e| e.reason.as_str()).collect();
        assert_eq!(reasons, vec!["third", "first"]);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut left = DiscoveredScope::new();
        left.insert("a");
        left.add_edge("a", "b", "peering");

        let right = left.clone();
        left.merge(&right);
        left.merge(&right);

        assert_eq!(left.visited.len(), 2);
        assert_eq!(left.edges.len(), 1);
    }
}
