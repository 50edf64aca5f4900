//! Cross-project flow-log correlation.
//!
//! Each project's log table is queried independently; a missing or
//! misconfigured table is the expected case (flow-log export is rarely
//! enabled everywhere) and is reported as a per-project error, never as a
//! correlation failure.

use std::sync::Arc;
use tracing::warn;

use netscope_common::{Correlation, CorrelationError, ProjectRef};

use crate::cloud::FlowLogStore;

pub struct FlowLogCorrelator {
    store: Arc<dyn FlowLogStore>,
}

impl FlowLogCorrelator {
    pub fn new(store: Arc<dyn FlowLogStore>) -> Self {
        Self { store }
    }

    /// Query every project for traffic between the IP pair (either
    /// direction), merge, sort by timestamp descending and truncate.
    ///
    /// The sort is stable, so records with equal timestamps keep their
    /// per-project arrival order.
    pub async fn correlate(
        &self,
        projects: &[ProjectRef],
        src_ip: &str,
        dst_ip: &str,
        limit: usize,
        lookback_hours: u32,
    ) -> Correlation {
        let mut correlation = Correlation::default();

        for project in dedup_preserving_order(projects) {
            match self.store.query_flows(&project, src_ip, dst_ip, lookback_hours, limit).await {
                Ok(records) => {
                    for mut record in records {
                        // The owning-project tag is authoritative here, not
                        // whatever the store impl happened to fill in.
                        record.source_dataset_project = project.clone();
                        correlation.records.push(record);
                    }
                }
                Err(e) => {
                    warn!("  Flow log query for `{}` failed: {}", project, e);
                    correlation
                        .errors
                        .push(CorrelationError { project: project.clone(), message: e.to_string() });
                }
            }
        }

        correlation.records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        correlation.records.truncate(limit);

        correlation.message = if correlation.records.is_empty() {
            format!(
                "found no flow log records for {} <-> {} in the last {}h - \
                 verify flow log export is enabled on the subnetworks involved",
                src_ip, dst_ip, lookback_hours
            )
        } else {
            format!(
                "found {} flow log record(s) for {} <-> {} in the last {}h",
                correlation.records.len(),
                src_ip,
                dst_ip,
                lookback_hours
            )
        };

        correlation
    }
}

fn dedup_preserving_order(projects: &[ProjectRef]) -> Vec<ProjectRef> {
    let mut seen = std::collections::BTreeSet::new();
    projects.iter().filter(|p| seen.insert(p.as_str().to_string())).cloned().collect()
}
