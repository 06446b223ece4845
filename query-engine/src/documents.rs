//! Tracked document set with upload/remove operations.
//!
//! The set is published as a [`DocumentsSnapshot`] through a `watch` channel.
//! An operation either succeeds and applies its whole change, or fails and
//! leaves the names untouched. A shared `busy` flag serializes operations on
//! one [`DocumentSet`]: a call made while another is running is refused.

use std::sync::Arc;

use rag_api_client::{DocumentUpload, RagTransport};
use tokio::sync::watch;
use tracing::{info, warn};

pub const UPLOAD_ERROR_MESSAGE: &str = "Error uploading files.";
pub const REMOVE_ERROR_MESSAGE: &str = "Error removing file.";
pub const BUSY_MESSAGE: &str = "Another document operation is in progress.";
pub const NO_FILES_MESSAGE: &str = "No files selected.";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentsSnapshot {
    /// Uploaded file names in upload order, without duplicates.
    pub names: Vec<String>,
    pub busy: bool,
    /// Last status or error message.
    pub message: Option<String>,
}

/// Outcome of one document operation, ready for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentOutcome {
    pub ok: bool,
    pub message: String,
}

impl DocumentOutcome {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

pub struct DocumentSet<T> {
    transport: Arc<T>,
    state: watch::Sender<DocumentsSnapshot>,
}

/// Holds the busy flag. Dropping it without [`finish`](BusyGuard::finish)
/// (e.g. when the operation future is dropped) clears the flag.
struct BusyGuard<'a> {
    state: &'a watch::Sender<DocumentsSnapshot>,
    done: bool,
}

impl BusyGuard<'_> {
    /// Clears `busy` and applies `f` in the same update.
    fn finish(mut self, f: impl FnOnce(&mut DocumentsSnapshot)) {
        self.state.send_modify(|s| {
            f(s);
            s.busy = false;
        });
        self.done = true;
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.state.send_modify(|s| s.busy = false);
        }
    }
}

impl<T: RagTransport> DocumentSet<T> {
    pub fn new(transport: Arc<T>) -> Self {
        let (state, _) = watch::channel(DocumentsSnapshot::default());
        Self { transport, state }
    }

    pub fn snapshot(&self) -> DocumentsSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DocumentsSnapshot> {
        self.state.subscribe()
    }

    pub fn names(&self) -> Vec<String> {
        self.state.borrow().names.clone()
    }

    /// Uploads `files` and tracks their names on success.
    ///
    /// Every accepted name is appended in upload order. A name that is
    /// already tracked is not added twice: re-uploading a file replaces it
    /// on the backend, so the list stays one entry per file.
    pub async fn add(&self, files: Vec<DocumentUpload>) -> DocumentOutcome {
        if files.is_empty() {
            return DocumentOutcome::failed(NO_FILES_MESSAGE);
        }
        let Some(guard) = self.acquire() else {
            return DocumentOutcome::failed(BUSY_MESSAGE);
        };

        match self.transport.upload_documents(&files).await {
            Ok(reply) => {
                let message = format!("Uploaded {} documents successfully!", reply.count);
                info!(files = files.len(), count = reply.count, "documents uploaded");
                guard.finish(|s| {
                    for file in files {
                        if !s.names.contains(&file.name) {
                            s.names.push(file.name);
                        }
                    }
                    s.message = Some(message.clone());
                });
                DocumentOutcome::ok(message)
            }
            Err(err) => {
                warn!(files = files.len(), error = %err, "document upload failed");
                guard.finish(|s| s.message = Some(UPLOAD_ERROR_MESSAGE.to_string()));
                DocumentOutcome::failed(UPLOAD_ERROR_MESSAGE)
            }
        }
    }

    /// Uploads raw texts. Texts have no names, so the tracked set is unchanged.
    pub async fn add_texts(&self, texts: Vec<String>) -> DocumentOutcome {
        let texts: Vec<String> = texts.into_iter().filter(|t| !t.trim().is_empty()).collect();
        if texts.is_empty() {
            return DocumentOutcome::failed(NO_FILES_MESSAGE);
        }
        let Some(guard) = self.acquire() else {
            return DocumentOutcome::failed(BUSY_MESSAGE);
        };

        match self.transport.upload_texts(&texts).await {
            Ok(reply) => {
                let message = format!("Uploaded {} documents successfully!", reply.count);
                info!(texts = texts.len(), count = reply.count, "texts uploaded");
                guard.finish(|s| s.message = Some(message.clone()));
                DocumentOutcome::ok(message)
            }
            Err(err) => {
                warn!(texts = texts.len(), error = %err, "text upload failed");
                guard.finish(|s| s.message = Some(UPLOAD_ERROR_MESSAGE.to_string()));
                DocumentOutcome::failed(UPLOAD_ERROR_MESSAGE)
            }
        }
    }

    /// Removes `name` on the backend and stops tracking it.
    pub async fn remove(&self, name: &str) -> DocumentOutcome {
        let Some(guard) = self.acquire() else {
            return DocumentOutcome::failed(BUSY_MESSAGE);
        };

        match self.transport.remove_documents(&[name.to_string()]).await {
            Ok(reply) => {
                info!(name, status = %reply.status, "document removed");
                guard.finish(|s| {
                    s.names.retain(|n| n != name);
                    s.message = Some(reply.status.clone());
                });
                DocumentOutcome::ok(reply.status)
            }
            Err(err) => {
                warn!(name, error = %err, "document removal failed");
                guard.finish(|s| s.message = Some(REMOVE_ERROR_MESSAGE.to_string()));
                DocumentOutcome::failed(REMOVE_ERROR_MESSAGE)
            }
        }
    }

    fn acquire(&self) -> Option<BusyGuard<'_>> {
        let acquired = self.state.send_if_modified(|s| {
            if s.busy {
                return false;
            }
            s.busy = true;
            true
        });
        acquired.then(|| BusyGuard {
            state: &self.state,
            done: false,
        })
    }
}
