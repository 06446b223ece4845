//! Transport layer for the AskMyDocs backend.
//!
//! - [`RagTransport`] is the seam the orchestration layer is written against.
//! - [`RagApiService`] implements it over HTTP/JSON with `reqwest`.
//! - [`models`] holds the wire DTOs and the metric group model.
//! - [`HealthService`] probes `GET /health`.

pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod models;
pub mod services;
mod transport;

pub use config::client_config::RagClientConfig;
pub use error_handler::{ConfigError, TransportError};
pub use health_service::{HealthService, HealthStatus};
pub use models::documents::{DocumentUpload, RemoveResponse, UploadResponse};
pub use models::metrics::{EvalRecord, MetricGroup, MetricsSnapshot, PENDING_SENTINEL};
pub use models::query::{AskResponse, MetricsResponse};
pub use services::rag_api_service::RagApiService;
pub use transport::RagTransport;
