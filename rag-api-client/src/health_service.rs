//! Liveness probe for the backend (`GET {base}/health`).
//!
//! [`HealthService::check`] is resilient and never fails (errors are mapped to
//! `ok = false`); [`HealthService::try_probe`] returns a strict `Result`.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::client_config::RagClientConfig;
use crate::error_handler::{Result, TransportError, make_snippet};

/// Timeout for the probe; the endpoint does no work.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// A serializable health snapshot of the backend.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Probed URL.
    pub endpoint: String,
    /// Overall health flag.
    pub ok: bool,
    /// Measured latency in milliseconds.
    pub latency_ms: u128,
    /// Short human-readable message with details.
    pub message: String,
}

#[derive(Deserialize)]
struct HealthBody {
    #[serde(default)]
    status: Option<String>,
}

/// Health checker with its own short-timeout HTTP client.
pub struct HealthService {
    client: reqwest::Client,
    url: String,
}

impl HealthService {
    /// # Errors
    /// Returns [`TransportError::Http`] if the HTTP client cannot be built.
    pub fn new(cfg: &RagClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(HEALTH_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: format!("{}/health", cfg.base()),
        })
    }

    /// Probes the backend; failures become `HealthStatus { ok: false, .. }`.
    pub async fn check(&self) -> HealthStatus {
        let start = Instant::now();
        match self.try_probe().await {
            Ok(status) => {
                info!(
                    endpoint = %status.endpoint,
                    ok = status.ok,
                    latency_ms = status.latency_ms,
                    "health probe completed"
                );
                status
            }
            Err(err) => {
                let status = HealthStatus {
                    endpoint: self.url.clone(),
                    ok: false,
                    latency_ms: start.elapsed().as_millis(),
                    message: err.to_string(),
                };
                warn!(
                    endpoint = %status.endpoint,
                    latency_ms = status.latency_ms,
                    message = %status.message,
                    "health probe failed"
                );
                status
            }
        }
    }

    /// Strict probe. Expects 2xx and `{"status": "ok"}`.
    pub async fn try_probe(&self) -> Result<HealthStatus> {
        debug!("GET {}", self.url);
        let start = Instant::now();
        let resp = self.client.get(&self.url).send().await?;
        let latency_ms = start.elapsed().as_millis();

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                status,
                url: self.url.clone(),
                snippet: make_snippet(&text),
            });
        }

        let reported = serde_json::from_str::<HealthBody>(&text)
            .ok()
            .and_then(|b| b.status);
        let (ok, message) = match reported.as_deref() {
            Some("ok") => (true, "backend is healthy".to_string()),
            Some(other) => (false, format!("backend reported status `{other}`")),
            None => (true, "backend is reachable; unexpected health body".to_string()),
        };

        Ok(HealthStatus {
            endpoint: self.url.clone(),
            ok,
            latency_ms,
            message,
        })
    }
}
