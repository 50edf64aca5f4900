//! Netscope Common - shared types and schemas for the netscope daemon and CLI.
//!
//! Everything the daemon and the CLI agree on lives here: the discovered-scope
//! graph, flow-log and reachability records, firewall actions, the closed tool
//! request set, session/evidence types, configuration, and the error taxonomy.

pub mod action;
pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod flowlog;
pub mod reachability;
pub mod scope;
pub mod session;
pub mod tools;

pub use action::*;
pub use api::*;
pub use config::NetscopeConfig;
pub use error::NetscopeError;
pub use extract::extract_project_ids;
pub use flowlog::*;
pub use reachability::*;
pub use scope::*;
pub use session::*;
pub use tools::*;

/// Crate version, embedded at build time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
