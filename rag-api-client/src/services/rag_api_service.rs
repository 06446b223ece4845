//! reqwest-backed client for the AskMyDocs backend.
//!
//! Endpoints:
//! - `POST {base}/query`: answer a question (`{question}`)
//! - `POST {base}/metrics`: current evaluation metrics (`{question}`)
//! - `POST {base}/upload`: index raw texts (`{texts}`)
//! - `POST {base}/upload_files`: index files (multipart, field `files` repeated)
//! - `POST {base}/remove_files`: drop documents (bare JSON array of names)
//!
//! # Examples
//!
//! ```no_run
//! use rag_api_client::{RagApiService, RagClientConfig, RagTransport};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let svc = RagApiService::new(RagClientConfig::default())?;
//! let reply = svc.submit_question("What is X?").await?;
//! println!("{}", reply.answer.unwrap_or_default());
//! # Ok(()) }
//! ```

use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};

use crate::config::client_config::RagClientConfig;
use crate::error_handler::{Result, TransportError, make_snippet, validate_http_endpoint};
use crate::models::documents::{
    DocumentUpload, RemoveResponse, UploadResponse, UploadTextsRequest,
};
use crate::models::query::{AskResponse, MetricsResponse, QuestionRequest};
use crate::transport::RagTransport;

/// Thin HTTP client for the backend.
///
/// Reuses a single [`reqwest::Client`] configured with the request timeout
/// from [`RagClientConfig`].
#[derive(Debug, Clone)]
pub struct RagApiService {
    client: reqwest::Client,
    url_query: String,
    url_metrics: String,
    url_upload: String,
    url_upload_files: String,
    url_remove_files: String,
}

impl RagApiService {
    /// Creates a new [`RagApiService`] from the given config.
    ///
    /// # Errors
    /// - [`TransportError::Config`] if `cfg.base_url` has no http(s) scheme
    /// - [`TransportError::Http`] if the HTTP client cannot be built
    pub fn new(cfg: RagClientConfig) -> Result<Self> {
        validate_http_endpoint("RAG_API_URL", &cfg.base_url)?;

        let client = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .user_agent("askmydocs-client/0.1")
            .build()?;

        let base = cfg.base();
        debug!(base, timeout_secs = cfg.timeout().as_secs(), "RagApiService initialized");

        Ok(Self {
            client,
            url_query: format!("{base}/query"),
            url_metrics: format!("{base}/metrics"),
            url_upload: format!("{base}/upload"),
            url_upload_files: format!("{base}/upload_files"),
            url_remove_files: format!("{base}/remove_files"),
        })
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!("POST {}", url);
        let resp = self.client.post(url).json(body).send().await?;
        decode(url, resp).await
    }
}

/// Checks the status and decodes a JSON body, keeping a body snippet on failure.
async fn decode<R: DeserializeOwned>(url: &str, resp: reqwest::Response) -> Result<R> {
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        let snippet = make_snippet(&text);
        error!(%url, %status, %snippet, "backend returned non-success status");
        return Err(TransportError::HttpStatus {
            status,
            url: url.to_string(),
            snippet,
        });
    }

    serde_json::from_str(&text).map_err(|e| {
        error!(%url, error = %e, "failed to decode backend response");
        TransportError::Decode(format!("{e}; body: {}", make_snippet(&text)))
    })
}

/// MIME type for the file kinds the backend extracts text from.
fn mime_for(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        "application/pdf"
    } else if lower.ends_with(".txt") || lower.ends_with(".md") {
        "text/plain"
    } else {
        "application/octet-stream"
    }
}

fn file_form(files: &[DocumentUpload]) -> Result<Form> {
    files.iter().try_fold(Form::new(), |form, file| {
        let part = Part::bytes(file.content.clone())
            .file_name(file.name.clone())
            .mime_str(mime_for(&file.name))
            .map_err(|e| TransportError::InvalidRequest(format!("{}: {e}", file.name)))?;
        Ok(form.part("files", part))
    })
}

impl RagTransport for RagApiService {
    #[instrument(skip(self), fields(url = %self.url_query))]
    async fn submit_question(&self, question: &str) -> Result<AskResponse> {
        self.post_json(&self.url_query, &QuestionRequest { question })
            .await
    }

    #[instrument(skip(self), fields(url = %self.url_metrics))]
    async fn poll_metrics(&self, question: &str) -> Result<MetricsResponse> {
        self.post_json(&self.url_metrics, &QuestionRequest { question })
            .await
    }

    #[instrument(skip_all, fields(files = files.len()))]
    async fn upload_documents(&self, files: &[DocumentUpload]) -> Result<UploadResponse> {
        let form = file_form(files)?;
        debug!("POST {}", self.url_upload_files);
        let resp = self
            .client
            .post(&self.url_upload_files)
            .multipart(form)
            .send()
            .await?;
        decode(&self.url_upload_files, resp).await
    }

    #[instrument(skip_all, fields(texts = texts.len()))]
    async fn upload_texts(&self, texts: &[String]) -> Result<UploadResponse> {
        self.post_json(&self.url_upload, &UploadTextsRequest { texts })
            .await
    }

    #[instrument(skip(self))]
    async fn remove_documents(&self, names: &[String]) -> Result<RemoveResponse> {
        self.post_json(&self.url_remove_files, names).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_endpoint_urls_from_base() {
        let svc = RagApiService::new(RagClientConfig {
            base_url: "http://localhost:8000/".into(),
            timeout_secs: Some(5),
        })
        .unwrap();
        assert_eq!(svc.url_query, "http://localhost:8000/query");
        assert_eq!(svc.url_metrics, "http://localhost:8000/metrics");
        assert_eq!(svc.url_upload, "http://localhost:8000/upload");
        assert_eq!(svc.url_upload_files, "http://localhost:8000/upload_files");
        assert_eq!(svc.url_remove_files, "http://localhost:8000/remove_files");
    }

    #[test]
    fn rejects_base_without_scheme() {
        let err = RagApiService::new(RagClientConfig {
            base_url: "localhost:8000".into(),
            timeout_secs: None,
        })
        .unwrap_err();
        assert!(matches!(err, TransportError::Config(_)));
    }

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_for("Report.PDF"), "application/pdf");
        assert_eq!(mime_for("notes.txt"), "text/plain");
        assert_eq!(mime_for("blob"), "application/octet-stream");
    }

    #[test]
    fn remove_body_is_bare_array() {
        let names = vec!["doc1.pdf".to_string()];
        assert_eq!(serde_json::to_string(&names[..]).unwrap(), r#"["doc1.pdf"]"#);
    }
}
