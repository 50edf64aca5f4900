//! Project identifier extraction.
//!
//! One pure function shared by the scope scanner and the reachability trace
//! scanner. Cloud resource URIs embed their owning project as
//! `.../projects/<id>/...`; anything matching that shape in a structured or
//! textual field is a candidate outbound project reference.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use crate::scope::ProjectRef;

/// Provider-owned service identities. These show up in resource URIs (peering
/// ranges, serverless connectors) but are never customer projects, so they
/// must never enter a discovered scope.
pub const DEFAULT_PROJECT_DENY_LIST: &[&str] = &[
    "google-managed-services",
    "serverless-vpc-access-images",
    "cloud-service-networking",
    "gke-master-projects",
];

/// Project ids are 6-30 chars: lowercase letters, digits, hyphens, starting
/// with a letter and not ending with a hyphen.
static PROJECT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"projects/([a-z][a-z0-9-]{4,28}[a-z0-9])").expect("valid regex"));

/// Extract every project id embedded in `text`, excluding the ids in
/// `exclude` (the scanned project itself plus the deny list).
///
/// Matching is case-sensitive exact; no normalization is performed.
pub fn extract_project_ids(text: &str, exclude: &BTreeSet<ProjectRef>) -> BTreeSet<ProjectRef> {
    let mut found = BTreeSet::new();
    for caps in PROJECT_ID_RE.captures_iter(text) {
        let id = &caps[1];
        if exclude.contains(id) {
            continue;
        }
        found.insert(id.to_string());
    }
    found
}

/// Convenience: build the exclusion set for a scan of `project`.
pub fn exclusion_set<I, S>(project: &str, deny_list: I) -> BTreeSet<ProjectRef>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut exclude: BTreeSet<ProjectRef> =
        deny_list.into_iter().map(|s| s.as_ref().to_string()).collect();
    exclude.insert(project.to_string());
    exclude
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exclude(items: &[&str]) -> BTreeSet<ProjectRef> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn extracts_from_resource_uri() {
        let text = "https://www.googleapis.com/compute/v1/projects/prod-net-host/global/networks/shared-vpc";
        let found = extract_project_ids(text, &BTreeSet::new());
        assert_eq!(found, exclude(&["prod-net-host"]));
    }

    #[test]
    fn extracts_multiple_distinct_ids() {
        let text = r#"{"network": "projects/host-proj-a/global/networks/net",
                      "subnetwork": "projects/svc-proj-b/regions/us-central1/subnetworks/snet"}"#;
        let found = extract_project_ids(text, &BTreeSet::new());
        assert_eq!(found, exclude(&["host-proj-a", "svc-proj-b"]));
    }

    #[test]
    fn rejects_excluded_and_denied_ids() {
        let text = "projects/self-proj/x projects/google-managed-services/y projects/other-proj/z";
        let excl = exclusion_set("self-proj", DEFAULT_PROJECT_DENY_LIST.iter());
        let found = extract_project_ids(text, &excl);
        assert_eq!(found, exclude(&["other-proj"]));
    }

    #[test]
    fn ignores_malformed_ids() {
        // Too short, uppercase, and bare "projects/" should not match.
        let text = "projects/ab/x projects/UPPER-CASE/y projects//z";
        let found = extract_project_ids(text, &BTreeSet::new());
        assert!(found.is_empty());
    }

    #[test]
    fn matching_is_case_sensitive_exact() {
        let text = "projects/mixed-case-proj/x";
        let excl = exclude(&["Mixed-Case-Proj"]);
        let found = extract_project_ids(text, &excl);
        // The exclusion uses a different case, so the id still matches.
        assert_eq!(found, exclude(&["mixed-case-proj"]));
    }
}
