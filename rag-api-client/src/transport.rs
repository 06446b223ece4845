use std::future::Future;

use crate::error_handler::Result;
use crate::models::documents::{DocumentUpload, RemoveResponse, UploadResponse};
use crate::models::query::{AskResponse, MetricsResponse};

/// The four remote operations the orchestration layer depends on.
///
/// Implementations are stateless request/response wrappers: no retries, no
/// merging, no caching. Every failure surfaces as [`TransportError`].
///
/// [`TransportError`]: crate::error_handler::TransportError
pub trait RagTransport: Send + Sync + 'static {
    /// Asks the backend to answer `question`.
    fn submit_question(&self, question: &str) -> impl Future<Output = Result<AskResponse>> + Send;

    /// Fetches whatever metrics the backend has computed so far for `question`.
    fn poll_metrics(&self, question: &str) -> impl Future<Output = Result<MetricsResponse>> + Send;

    /// Uploads files; the call succeeds or fails as a whole.
    fn upload_documents(
        &self,
        files: &[DocumentUpload],
    ) -> impl Future<Output = Result<UploadResponse>> + Send;

    /// Uploads raw texts; the call succeeds or fails as a whole.
    fn upload_texts(&self, texts: &[String]) -> impl Future<Output = Result<UploadResponse>> + Send;

    /// Removes previously uploaded documents by file name.
    fn remove_documents(
        &self,
        names: &[String],
    ) -> impl Future<Output = Result<RemoveResponse>> + Send;
}
