use std::time::Duration;

use crate::error_handler::{ConfigError, env_opt, env_opt_u64, validate_http_endpoint};

/// Backend used when `RAG_API_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Per-request timeout used when `RAG_API_TIMEOUT_SECS` is unset.
///
/// Answer generation on the backend runs retrieval plus an LLM call, so the
/// default is generous.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Connection settings for the RAG backend.
///
/// # Fields
///
/// - `base_url`: Backend root, e.g. `"http://localhost:8000"` (no trailing path).
/// - `timeout_secs`: Optional request timeout; [`DEFAULT_TIMEOUT_SECS`] if `None`.
///
/// # Examples
///
/// ```
/// use rag_api_client::config::client_config::RagClientConfig;
///
/// let cfg = RagClientConfig {
///     base_url: "http://localhost:8000".to_string(),
///     timeout_secs: Some(30),
/// };
/// assert_eq!(cfg.timeout().as_secs(), 30);
/// ```
#[derive(Debug, Clone)]
pub struct RagClientConfig {
    /// Backend root URL.
    pub base_url: String,

    /// Optional request timeout (in seconds).
    pub timeout_secs: Option<u64>,
}

impl Default for RagClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
        }
    }
}

impl RagClientConfig {
    /// Loads the config from environment variables.
    ///
    /// # Env
    /// - `RAG_API_URL` (optional, default [`DEFAULT_BASE_URL`])
    /// - `RAG_API_TIMEOUT_SECS` (optional, default [`DEFAULT_TIMEOUT_SECS`])
    ///
    /// # Errors
    /// - [`ConfigError::InvalidFormat`] if `RAG_API_URL` lacks an http(s) scheme
    /// - [`ConfigError::InvalidNumber`] if `RAG_API_TIMEOUT_SECS` is not a `u64`
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env_opt("RAG_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        validate_http_endpoint("RAG_API_URL", &base_url)?;
        let timeout_secs = env_opt_u64("RAG_API_TIMEOUT_SECS")?;

        Ok(Self {
            base_url: base_url.trim().to_string(),
            timeout_secs,
        })
    }

    /// Effective request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Base URL without trailing slashes.
    pub fn base(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_strips_trailing_slashes() {
        let cfg = RagClientConfig {
            base_url: " http://localhost:8000// ".into(),
            timeout_secs: None,
        };
        assert_eq!(cfg.base(), "http://localhost:8000");
        assert_eq!(cfg.timeout().as_secs(), DEFAULT_TIMEOUT_SECS);
    }
}
