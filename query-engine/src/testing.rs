//! Scripted in-memory transport for engine tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use rag_api_client::error_handler::Result;
use rag_api_client::{
    AskResponse, DocumentUpload, MetricsResponse, RagTransport, RemoveResponse, TransportError,
    UploadResponse,
};
use tokio::sync::oneshot;

/// One scripted reply: ready now, or held until the test releases it.
enum Step<R> {
    Ready(Result<R>),
    Held(oneshot::Receiver<Result<R>>),
}

type Script<R> = Mutex<HashMap<String, VecDeque<Step<R>>>>;

const UPLOAD_KEY: &str = "upload_documents";
const TEXTS_KEY: &str = "upload_texts";
const REMOVE_KEY: &str = "remove_documents";

/// Replies are queued per question (or per operation for documents) and
/// consumed in order. A missing reply is a transport failure.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    answers: Script<AskResponse>,
    metrics: Script<MetricsResponse>,
    uploads: Script<UploadResponse>,
    removes: Script<RemoveResponse>,
    calls: Mutex<Vec<String>>,
}

fn push<R>(script: &Script<R>, key: &str, step: Step<R>) {
    script
        .lock()
        .unwrap()
        .entry(key.to_string())
        .or_default()
        .push_back(step);
}

async fn next<R>(script: &Script<R>, key: &str) -> Result<R> {
    let step = script
        .lock()
        .unwrap()
        .get_mut(key)
        .and_then(VecDeque::pop_front);
    match step {
        Some(Step::Ready(reply)) => reply,
        Some(Step::Held(rx)) => rx
            .await
            .unwrap_or_else(|_| Err(TransportError::Decode("held reply dropped".into()))),
        None => Err(TransportError::Decode(format!("no scripted reply for {key}"))),
    }
}

impl ScriptedTransport {
    pub(crate) fn answer(&self, question: &str, reply: Result<AskResponse>) {
        push(&self.answers, question, Step::Ready(reply));
    }

    pub(crate) fn hold_answer(&self, question: &str, rx: oneshot::Receiver<Result<AskResponse>>) {
        push(&self.answers, question, Step::Held(rx));
    }

    pub(crate) fn metrics(&self, question: &str, reply: Result<MetricsResponse>) {
        push(&self.metrics, question, Step::Ready(reply));
    }

    pub(crate) fn hold_metrics(
        &self,
        question: &str,
        rx: oneshot::Receiver<Result<MetricsResponse>>,
    ) {
        push(&self.metrics, question, Step::Held(rx));
    }

    pub(crate) fn upload(&self, reply: Result<UploadResponse>) {
        push(&self.uploads, UPLOAD_KEY, Step::Ready(reply));
    }

    pub(crate) fn hold_upload(&self, rx: oneshot::Receiver<Result<UploadResponse>>) {
        push(&self.uploads, UPLOAD_KEY, Step::Held(rx));
    }

    pub(crate) fn upload_texts_reply(&self, reply: Result<UploadResponse>) {
        push(&self.uploads, TEXTS_KEY, Step::Ready(reply));
    }

    pub(crate) fn remove(&self, reply: Result<RemoveResponse>) {
        push(&self.removes, REMOVE_KEY, Step::Ready(reply));
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn poll_count(&self, question: &str) -> usize {
        let tag = format!("poll:{question}");
        self.calls.lock().unwrap().iter().filter(|c| **c == tag).count()
    }

    /// Yields until at least `n` polls for `question` were issued.
    pub(crate) async fn wait_for_polls(&self, question: &str, n: usize) {
        for _ in 0..1000 {
            if self.poll_count(question) >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {n} polls for {question}, saw {:?}", self.calls());
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RagTransport for ScriptedTransport {
    async fn submit_question(&self, question: &str) -> Result<AskResponse> {
        self.record(format!("ask:{question}"));
        next(&self.answers, question).await
    }

    async fn poll_metrics(&self, question: &str) -> Result<MetricsResponse> {
        self.record(format!("poll:{question}"));
        next(&self.metrics, question).await
    }

    async fn upload_documents(&self, files: &[DocumentUpload]) -> Result<UploadResponse> {
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        self.record(format!("upload:{}", names.join(",")));
        next(&self.uploads, UPLOAD_KEY).await
    }

    async fn upload_texts(&self, texts: &[String]) -> Result<UploadResponse> {
        self.record(format!("texts:{}", texts.len()));
        next(&self.uploads, TEXTS_KEY).await
    }

    async fn remove_documents(&self, names: &[String]) -> Result<RemoveResponse> {
        self.record(format!("remove:{}", names.join(",")));
        next(&self.removes, REMOVE_KEY).await
    }
}

/// A successful `/metrics` reply carrying `metrics`.
pub(crate) fn metrics_reply(metrics: serde_json::Value) -> Result<MetricsResponse> {
    Ok(serde_json::from_value(serde_json::json!({ "metrics": metrics }))
        .expect("valid metrics reply"))
}

pub(crate) fn answer_reply(answer: &str) -> Result<AskResponse> {
    Ok(AskResponse {
        answer: Some(answer.to_string()),
        ..AskResponse::default()
    })
}
