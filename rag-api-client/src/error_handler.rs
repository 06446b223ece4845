//! Unified error handling for `rag-api-client`.
//!
//! Every remote failure (network, non-2xx status, undecodable body) is
//! flattened into [`TransportError`]. Callers above this crate never inspect
//! status codes or headers; they only learn that the call failed.
//!
//! Configuration problems are grouped in [`ConfigError`]. Small helpers for
//! reading/validating environment variables return the unified [`Result<T>`]
//! alias.
//!
//! All messages include the prefix `[RAG API Client]` to simplify attribution in logs.

use reqwest::StatusCode;
use thiserror::Error;

/* ------------------------------------------------------------------------- */
/* Public result alias                                                       */
/* ------------------------------------------------------------------------- */

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Max characters of a response body kept in error messages.
const SNIPPET_LIMIT: usize = 240;

/* ------------------------------------------------------------------------- */
/* Transport errors                                                          */
/* ------------------------------------------------------------------------- */

/// Single failure type for every remote operation.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TransportError {
    /// Configuration/validation errors (client construction).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Underlying HTTP transport error (connect, timeout, body read).
    #[error("[RAG API Client] transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream returned a non-successful HTTP status.
    #[error("[RAG API Client] HTTP {status} from {url}: {snippet}")]
    HttpStatus {
        /// HTTP status code.
        status: StatusCode,
        /// Request URL.
        url: String,
        /// Short snippet of the response body (trimmed).
        snippet: String,
    },

    /// Response payload could not be decoded as expected.
    #[error("[RAG API Client] decode error: {0}")]
    Decode(String),

    /// Local input for a request could not be prepared (e.g. multipart part).
    #[error("[RAG API Client] invalid request: {0}")]
    InvalidRequest(String),
}

/* ------------------------------------------------------------------------- */
/* Config errors                                                             */
/* ------------------------------------------------------------------------- */

/// Error enum for environment/config-driven setup.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A number failed to parse (timeouts, limits).
    #[error("[RAG API Client] invalid number in {var}: {reason}")]
    InvalidNumber {
        /// Variable name (e.g., `RAG_API_TIMEOUT_SECS`).
        var: &'static str,
        /// Human-readable reason (e.g., `expected u64`).
        reason: &'static str,
    },

    /// Value had the wrong format (e.g., invalid URL).
    #[error("[RAG API Client] invalid format in {var}: {reason}")]
    InvalidFormat {
        /// Variable name (e.g., `RAG_API_URL`).
        var: &'static str,
        /// Explanation (e.g., `must start with http:// or https://`).
        reason: &'static str,
    },
}

/// Trims a response body to a short single-line snippet for error messages.
pub fn make_snippet(body: &str) -> String {
    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= SNIPPET_LIMIT {
        flat
    } else {
        let cut: String = flat.chars().take(SNIPPET_LIMIT).collect();
        format!("{cut}…")
    }
}

/* ------------------------------------------------------------------------- */
/* Env helpers (return unified `Result<T>`)                                  */
/* ------------------------------------------------------------------------- */

/// Reads an optional, non-empty environment variable.
pub fn env_opt(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parses an optional `u64` from env (`Ok(None)` if unset/empty).
///
/// # Errors
/// Returns [`ConfigError::InvalidNumber`] if the variable is set but not a
/// valid `u64`.
pub fn env_opt_u64(name: &'static str) -> std::result::Result<Option<u64>, ConfigError> {
    match env_opt(name) {
        Some(v) => v
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber {
                var: name,
                reason: "expected u64",
            }),
        None => Ok(None),
    }
}

/* ------------------------------------------------------------------------- */
/* Validation helpers                                                        */
/* ------------------------------------------------------------------------- */

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
///
/// # Errors
/// Returns [`ConfigError::InvalidFormat`] when the string does not start with
/// a valid HTTP scheme.
pub fn validate_http_endpoint(
    var: &'static str,
    value: &str,
) -> std::result::Result<(), ConfigError> {
    let value = value.trim();
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidFormat {
            var,
            reason: "must start with http:// or https://",
        })
    }
}
