//! Remediation execution.
//!
//! The only mutating path in the system. Every failure below this point is
//! converted to a FAILURE report - a mutation-layer error must never escape
//! as an unhandled fault, because the caller has already passed the
//! confirmation gate and owes the user a definite outcome either way.

use std::sync::Arc;
use tracing::{error, info};

use netscope_common::{ApplyReport, FirewallAction, RuleVerb};

use crate::cloud::FirewallApi;

pub struct RemediationExecutor {
    firewall: Arc<dyn FirewallApi>,
}

impl RemediationExecutor {
    pub fn new(firewall: Arc<dyn FirewallApi>) -> Self {
        Self { firewall }
    }

    /// Apply one staged action. An unrecognized verb fails before any
    /// external call. Unset optional fields are stripped by the action's
    /// wire serialization. When the underlying operation yields no
    /// completion signal, the report is SUCCESS but says so - it must not
    /// claim verification occurred.
    pub async fn apply(&self, action: &FirewallAction) -> ApplyReport {
        let verb = match RuleVerb::parse(&action.verb) {
            Some(verb) => verb,
            None => {
                return ApplyReport::failure(format!(
                    "unrecognized verb `{}` - expected CREATE, UPDATE or DELETE; no call was made",
                    action.verb
                ));
            }
        };

        info!("  Applying {} of rule `{}` in `{}`", verb.as_str(), action.rule_name, action.project_id);

        match self.firewall.apply(action).await {
            Ok(outcome) if outcome.completed => ApplyReport::success(format!(
                "{} of firewall rule `{}` in `{}` completed: {}",
                verb.as_str(),
                action.rule_name,
                action.project_id,
                outcome.message
            )),
            Ok(outcome) => ApplyReport::success(format!(
                "{} of firewall rule `{}` in `{}` was submitted, but completion \
                 was not observed: {}",
                verb.as_str(),
                action.rule_name,
                action.project_id,
                outcome.message
            )),
            Err(e) => {
                error!("  Mutation failed: {}", e);
                ApplyReport::failure(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::fakes::FakeFirewall;
    use netscope_common::ApplyStatus;

    fn action(verb: &str) -> FirewallAction {
        FirewallAction {
            project_id: "proj-a".to_string(),
            verb: verb.to_string(),
            rule_name: "allow-health-checks".to_string(),
            network: None,
            direction: None,
            priority: None,
            target_tags: vec![],
            source_ranges: vec![],
            allowed: vec![],
            denied: vec![],
        }
    }

    #[tokio::test]
    async fn unknown_verb_fails_without_any_call() {
        let firewall = Arc::new(FakeFirewall::succeeding());
        let executor = RemediationExecutor::new(firewall.clone());

        let report = executor.apply(&action("UPSERT")).await;

        assert_eq!(report.status, ApplyStatus::Failure);
        assert!(report.message.contains("UPSERT"));
        assert_eq!(firewall.apply_count(), 0);
    }

    #[tokio::test]
    async fn completed_mutation_reports_success() {
        let firewall = Arc::new(FakeFirewall::succeeding());
        let executor = RemediationExecutor::new(firewall.clone());

        let report = executor.apply(&action("CREATE")).await;

        assert!(report.is_success());
        assert_eq!(firewall.apply_count(), 1);
    }

    #[tokio::test]
    async fn missing_completion_signal_is_stated_plainly() {
        let firewall = Arc::new(FakeFirewall::without_completion());
        let executor = RemediationExecutor::new(firewall);

        let report = executor.apply(&action("UPDATE")).await;

        assert!(report.is_success());
        assert!(report.message.contains("completion was not observed"));
    }

    #[tokio::test]
    async fn mutation_error_becomes_a_failure_report() {
        let firewall = Arc::new(FakeFirewall::failing("permission denied on firewalls.create"));
        let executor = RemediationExecutor::new(firewall);

        let report = executor.apply(&action("CREATE")).await;

        assert_eq!(report.status, ApplyStatus::Failure);
        assert!(report.message.contains("permission denied"));
    }
}
