//! Wire DTOs and the metric data model shared with the orchestration layer.

pub mod documents;
pub mod metrics;
pub mod query;
