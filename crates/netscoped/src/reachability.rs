//! Active reachability probing.
//!
//! One probe = one ephemeral test resource: create, wait for the async
//! evaluation, read the verdict and hop trace, delete. Deletion runs on
//! every exit path - including cancellation mid-wait, which is covered by a
//! drop guard that spawns the delete if the happy-path delete never ran.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

use netscope_common::{
    extract::exclusion_set, extract_project_ids, ProjectRef, ReachabilityResult,
    ReachabilityVerdict,
};

use crate::cloud::{RawTestOutcome, ReachabilitySpec, ReachabilityService};

/// Deletes the test resource on drop unless disarmed. Cancellation of the
/// probe future drops the guard while still armed; the delete then runs on a
/// spawned task because drop cannot await.
struct TestCleanupGuard {
    service: Arc<dyn ReachabilityService>,
    test_id: String,
    armed: bool,
}

impl TestCleanupGuard {
    fn new(service: Arc<dyn ReachabilityService>, test_id: String) -> Self {
        Self { service, test_id, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TestCleanupGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let service = self.service.clone();
        let test_id = std::mem::take(&mut self.test_id);
        tokio::spawn(async move {
            if let Err(e) = service.delete_test(&test_id).await {
                warn!("  Cleanup of reachability test `{}` failed: {}", test_id, e);
            }
        });
    }
}

pub struct ReachabilityProber {
    service: Arc<dyn ReachabilityService>,
    deny_list: Vec<String>,
}

impl ReachabilityProber {
    pub fn new(service: Arc<dyn ReachabilityService>, deny_list: Vec<String>) -> Self {
        Self { service, deny_list }
    }

    /// Run one path test. Failures to create or evaluate the test come back
    /// as an UNDETERMINED result carrying a remediation hint - the workflow
    /// must be able to continue with other evidence sources.
    pub async fn probe(&self, spec: &ReachabilitySpec) -> ReachabilityResult {
        let test_id = match self.service.create_test(spec).await {
            Ok(id) => id,
            Err(e) => {
                warn!("  Reachability test creation failed: {}", e);
                return Self::error_result(
                    String::new(),
                    format!(
                        "reachability test could not be created: {}. \
                         Verify the network management API is enabled in project `{}`",
                        e, spec.project_id
                    ),
                );
            }
        };

        let guard = TestCleanupGuard::new(self.service.clone(), test_id.clone());

        let result = match self.service.wait_result(&test_id).await {
            Ok(outcome) => self.map_outcome(&test_id, &spec.project_id, outcome),
            Err(e) => {
                warn!("  Reachability test `{}` evaluation failed: {}", test_id, e);
                Self::error_result(
                    test_id.clone(),
                    format!(
                        "reachability test was created but did not evaluate: {}. \
                         Re-run once the network management API quota allows it",
                        e
                    ),
                )
            }
        };

        // Happy-path delete; the guard only fires when this is never reached.
        guard.disarm();
        if let Err(e) = self.service.delete_test(&test_id).await {
            // Recoverable cleanup failure: the verdict stands.
            warn!("  Failed to delete reachability test `{}`: {}", test_id, e);
        }

        info!("  Reachability probe {}: {}", test_id, result.verdict.as_str());
        result
    }

    fn map_outcome(
        &self,
        test_id: &str,
        project_id: &str,
        outcome: RawTestOutcome,
    ) -> ReachabilityResult {
        let exclude = exclusion_set(project_id, self.deny_list.iter());
        let mut discovered: BTreeSet<ProjectRef> = BTreeSet::new();
        let mut trace = Vec::new();

        for hop in &outcome.trace {
            let serialized = hop.to_string();
            discovered.extend(extract_project_ids(&serialized, &exclude));

            let description = hop
                .get("description")
                .and_then(|d| d.as_str())
                .map(|d| d.to_string())
                .unwrap_or(serialized);
            trace.push(description);
        }

        ReachabilityResult {
            test_id: test_id.to_string(),
            verdict: ReachabilityVerdict::from_provider(&outcome.verdict),
            trace,
            discovered_projects: discovered,
            hint: outcome.error,
        }
    }

    fn error_result(test_id: String, hint: String) -> ReachabilityResult {
        ReachabilityResult {
            test_id,
            verdict: ReachabilityVerdict::Undetermined,
            trace: Vec::new(),
            discovered_projects: BTreeSet::new(),
            hint: Some(hint),
        }
    }
}
