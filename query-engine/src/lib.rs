//! Orchestration layer for AskMyDocs.
//!
//! Sits between a [`RagTransport`](rag_api_client::RagTransport) and a front
//! end:
//! - [`merge`] folds partial metric replies into a running snapshot;
//! - [`poller`] drives the cancellable metrics polling loop;
//! - [`session`] is the ask → answer → metrics state machine;
//! - [`documents`] tracks uploaded documents.
//!
//! Front ends only read published snapshots (`watch` channels) and call the
//! async operations; remote failures come back as display strings, never as
//! errors.

pub mod cfg;
pub mod documents;
pub mod error;
pub mod merge;
pub mod poller;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use cfg::EngineConfig;
pub use documents::{DocumentOutcome, DocumentSet, DocumentsSnapshot};
pub use error::EngineError;
pub use merge::merge;
pub use poller::{MetricsPoller, PollHandle, PollPolicy, PollReport, PollSink, PollState, PollUpdate, StopReason};
pub use session::{AskOutcome, LoadingFlags, QuerySession, SessionPhase, SessionSnapshot};
