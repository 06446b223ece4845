//! Typed error for the query-engine crate.
//!
//! Orchestration calls never fail outward: remote failures are turned into
//! fixed user messages at the session/document boundary. Only configuration
//! loading returns an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A numeric variable failed to parse or is out of range.
    #[error("[Query Engine] invalid number in {var}: {reason}")]
    InvalidNumber {
        var: &'static str,
        reason: &'static str,
    },

    /// The expected metric group list is empty.
    #[error("[Query Engine] {0} must name at least one metric group")]
    NoMetricGroups(&'static str),
}
