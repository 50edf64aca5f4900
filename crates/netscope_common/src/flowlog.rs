//! Flow log records and cross-project correlation results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scope::ProjectRef;

/// One passively captured traffic record, immutable once read from the
/// export store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowLogRecord {
    pub timestamp: DateTime<Utc>,
    pub src_ip: String,
    pub src_port: u16,
    pub dst_ip: String,
    pub dst_port: u16,
    pub protocol: String,
    pub bytes_sent: u64,
    /// Round-trip time, when the exporter recorded one.
    pub rtt_msec: Option<u64>,
    /// Project whose log table produced this record.
    pub source_dataset_project: ProjectRef,
    pub subnetwork: Option<String>,
}

/// A per-project query failure. Expected whenever flow-log export is not
/// enabled everywhere; never fatal to the correlation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationError {
    pub project: ProjectRef,
    pub message: String,
}

/// Merged, sorted, truncated result of a cross-project flow-log correlation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Correlation {
    pub records: Vec<FlowLogRecord>,
    pub errors: Vec<CorrelationError>,
    /// Guidance for the next workflow step ("found N" vs "found none -
    /// verify export is enabled").
    pub message: String,
}
