//! Netscope configuration.
//!
//! Config file: ~/.config/netscope/config.toml or /etc/netscope/config.toml.
//! Environment variables override file values so a daemon can be pointed at a
//! different oracle or project without editing files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::extract::DEFAULT_PROJECT_DENY_LIST;

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address. Localhost only by default.
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:7411".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

/// Reasoning oracle settings (an Ollama-compatible generate endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_oracle_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_oracle_model")]
    pub model: String,

    /// Per-decision timeout. Oracle calls are the slowest suspension point
    /// after reachability polls.
    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,
}

fn default_oracle_endpoint() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_oracle_model() -> String {
    "qwen3:8b".to_string()
}

fn default_oracle_timeout() -> u64 {
    60
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: default_oracle_endpoint(),
            model: default_oracle_model(),
            timeout_secs: default_oracle_timeout(),
        }
    }
}

/// Cloud API surface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Project used when a request does not name one.
    #[serde(default)]
    pub default_project: Option<String>,

    #[serde(default = "default_compute_endpoint")]
    pub compute_endpoint: String,

    #[serde(default = "default_netmgmt_endpoint")]
    pub network_management_endpoint: String,

    #[serde(default = "default_logging_endpoint")]
    pub logging_endpoint: String,

    /// Environment variable holding the API bearer token.
    #[serde(default = "default_token_env")]
    pub access_token_env: String,

    /// Project identifiers that must never be treated as discovered
    /// customer projects (provider-owned service identities).
    #[serde(default = "default_deny_list")]
    pub project_deny_list: Vec<String>,
}

fn default_compute_endpoint() -> String {
    "https://compute.googleapis.com/compute/v1".to_string()
}

fn default_netmgmt_endpoint() -> String {
    "https://networkmanagement.googleapis.com/v1".to_string()
}

fn default_logging_endpoint() -> String {
    "https://logging.googleapis.com/v2".to_string()
}

fn default_token_env() -> String {
    "NETSCOPE_ACCESS_TOKEN".to_string()
}

fn default_deny_list() -> Vec<String> {
    DEFAULT_PROJECT_DENY_LIST
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            default_project: None,
            compute_endpoint: default_compute_endpoint(),
            network_management_endpoint: default_netmgmt_endpoint(),
            logging_endpoint: default_logging_endpoint(),
            access_token_env: default_token_env(),
            project_deny_list: default_deny_list(),
        }
    }
}

/// Main netscope configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetscopeConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub oracle: OracleConfig,

    #[serde(default)]
    pub cloud: CloudConfig,
}

impl NetscopeConfig {
    /// Default user config path: ~/.config/netscope/config.toml
    pub fn user_config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("XDG_CONFIG_HOME"))
            .context("Cannot determine home directory")?;

        let config_dir = if home.contains("/.config") {
            PathBuf::from(home)
        } else {
            Path::new(&home).join(".config")
        };

        Ok(config_dir.join("netscope").join("config.toml"))
    }

    /// System config path: /etc/netscope/config.toml
    pub fn system_config_path() -> PathBuf {
        PathBuf::from("/etc/netscope/config.toml")
    }

    /// Load configuration.
    ///
    /// Priority:
    /// 1. User config (~/.config/netscope/config.toml)
    /// 2. System config (/etc/netscope/config.toml)
    /// 3. Defaults
    ///
    /// Environment overrides are applied on top of whichever source won.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        if let Ok(user_path) = Self::user_config_path() {
            if user_path.exists() {
                return Self::load_from(&user_path);
            }
        }

        let system_path = Self::system_config_path();
        if system_path.exists() {
            return Self::load_from(&system_path);
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: NetscopeConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Apply `NETSCOPE_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(bind) = std::env::var("NETSCOPE_BIND") {
            self.server.bind = bind;
        }
        if let Ok(endpoint) = std::env::var("NETSCOPE_ORACLE_ENDPOINT") {
            self.oracle.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("NETSCOPE_ORACLE_MODEL") {
            self.oracle.model = model;
        }
        if let Ok(project) = std::env::var("NETSCOPE_DEFAULT_PROJECT") {
            if !project.trim().is_empty() {
                self.cloud.default_project = Some(project);
            }
        }
    }

    /// Resolve the project a request should run against: explicit request
    /// value first, then the configured default.
    pub fn resolve_project(&self, requested: Option<&str>) -> Option<String> {
        match requested {
            Some(p) if !p.trim().is_empty() => Some(p.trim().to_string()),
            _ => self.cloud.default_project.clone(),
        }
    }
}
