//! DTOs for `/query` and `/metrics`.

use serde::{Deserialize, Serialize};

use crate::models::metrics::MetricsSnapshot;

/// Request payload shared by `/query` and `/metrics`.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionRequest<'a> {
    pub question: &'a str,
}

/// Response payload of `/query`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AskResponse {
    /// Generated answer; empty or missing when nothing relevant was found.
    #[serde(default)]
    pub answer: Option<String>,
    /// Retrieved passages the answer was built from.
    #[serde(default)]
    pub context: Option<Vec<String>>,
    /// Optional summary of the retrieved context.
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Response payload of `/metrics`.
///
/// The backend answers `{"error": "..."}` (no `metrics`) when it has no
/// cached answer for the question yet; that decodes to an empty partial.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MetricsResponse {
    #[serde(default)]
    pub metrics: Option<MetricsSnapshot>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl MetricsResponse {
    /// Metrics carried by this reply, empty when none were sent.
    pub fn partial(&self) -> MetricsSnapshot {
        self.metrics.clone().unwrap_or_default()
    }
}
