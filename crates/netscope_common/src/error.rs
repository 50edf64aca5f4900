//! Error types for netscope.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetscopeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Resource inventory error: {0}")]
    Inventory(String),

    #[error("Reachability service error: {0}")]
    Reachability(String),

    #[error("Flow log query error: {0}")]
    FlowLog(String),

    #[error("Mutation error: {0}")]
    Mutation(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown session: {0}")]
    SessionNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl NetscopeError {
    /// Stable numeric code for RPC/API surfaces.
    pub fn code(&self) -> i32 {
        match self {
            NetscopeError::Config(_) => -32010,
            NetscopeError::Oracle(_) => -32011,
            NetscopeError::Inventory(_) => -32012,
            NetscopeError::Reachability(_) => -32013,
            NetscopeError::FlowLog(_) => -32014,
            NetscopeError::Mutation(_) => -32015,
            NetscopeError::Validation(_) => -32602,
            NetscopeError::SessionNotFound(_) => -32016,
            NetscopeError::Io(_) => -32017,
            NetscopeError::Json(_) => -32700,
            NetscopeError::Internal(_) => -32603,
        }
    }
}
