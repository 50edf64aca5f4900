//! HTTP client for talking to the netscope daemon.

use anyhow::{anyhow, Context, Result};
use std::time::Duration;
use uuid::Uuid;

use netscope_common::{
    HealthResponse, SessionResponse, TroubleshootRequest, TroubleshootResponse,
};

/// Diagnosis turns can take a while: scope scans plus a reachability poll.
const REQUEST_TIMEOUT_SECS: u64 = 300;

pub struct DaemonClient {
    http_client: reqwest::Client,
    base: String,
}

impl DaemonClient {
    /// Endpoint priority: explicit flag, $NETSCOPED_URL, localhost default.
    pub fn discover(explicit: Option<&str>) -> Result<Self> {
        let base = match explicit {
            Some(url) => url.to_string(),
            None => std::env::var("NETSCOPED_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:7411".to_string()),
        };

        Ok(Self {
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .context("Failed to build HTTP client")?,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    pub async fn troubleshoot(
        &self,
        prompt: &str,
        project_id: Option<String>,
        session_id: Option<Uuid>,
    ) -> Result<TroubleshootResponse> {
        let request = TroubleshootRequest {
            prompt: Some(prompt.to_string()),
            project_id,
            session_id,
        };

        let response = self
            .http_client
            .post(format!("{}/v1/troubleshoot", self.base))
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Daemon unreachable at {}", self.base))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            return Err(anyhow!("Daemon answered {}: {}", status, message));
        }

        response.json().await.context("Malformed daemon response")
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .http_client
            .get(format!("{}/v1/health", self.base))
            .send()
            .await
            .with_context(|| format!("Daemon unreachable at {}", self.base))?;
        response.json().await.context("Malformed health response")
    }

    pub async fn session(&self, id: Uuid) -> Result<SessionResponse> {
        let response = self
            .http_client
            .get(format!("{}/v1/session/{}", self.base, id))
            .send()
            .await
            .with_context(|| format!("Daemon unreachable at {}", self.base))?;

        if !response.status().is_success() {
            return Err(anyhow!("Unknown session {}", id));
        }
        response.json().await.context("Malformed session response")
    }
}
