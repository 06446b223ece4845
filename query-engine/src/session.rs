//! Query session: one current question, its answer and its metrics.
//!
//! State is published as whole [`SessionSnapshot`] values through a `watch`
//! channel, so readers never observe a half-applied update. Every snapshot
//! carries the generation of the ask that produced it. Answer replies and
//! poll updates are applied only while their generation is still current;
//! anything else is a stale response and is dropped.
//!
//! ```text
//! Idle ──ask──▶ AwaitingAnswer ──answer──▶ AwaitingMetrics ──loop stops──▶ Settled
//!                     │
//!                     └──failure──▶ Error
//! ```
//!
//! `ask` always supersedes: it bumps the generation, cancels the previous
//! polling loop and starts from a cleared snapshot.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rag_api_client::{MetricsSnapshot, RagTransport};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::poller::{MetricsPoller, PollHandle, PollPolicy, PollReport, PollSink, PollState, PollUpdate};

/// Answer shown when the backend replies with an empty answer.
pub const NO_ANSWER_MESSAGE: &str = "No relevant information found.";
/// Answer shown when the answer request fails.
pub const ANSWER_ERROR_MESSAGE: &str = "Error fetching answer.";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Idle,
    AwaitingAnswer,
    /// Answer is shown; metrics are being polled.
    AwaitingMetrics,
    Settled,
    Error,
}

/// In-flight indicators for the two remote activities of an ask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadingFlags {
    pub answer_pending: bool,
    pub metrics_pending: bool,
}

/// Everything a front end renders for the current question.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionSnapshot {
    /// Incremented by every accepted ask; `0` before the first one.
    pub generation: u64,
    pub phase: SessionPhase,
    pub question: Option<String>,
    pub answer: Option<String>,
    pub context: Vec<String>,
    pub metrics: Option<MetricsSnapshot>,
    pub reasoning: Option<String>,
    pub flags: LoadingFlags,
    pub poll: PollState,
}

impl SessionSnapshot {
    pub fn is_busy(&self) -> bool {
        self.flags.answer_pending || self.flags.metrics_pending
    }
}

/// Result of [`QuerySession::ask`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AskOutcome {
    /// Answer shown, metrics polling started.
    Answered,
    /// Answer request failed; error message shown.
    Failed,
    /// A newer ask took over before the answer arrived.
    Superseded,
    /// Blank question; nothing changed.
    Ignored,
}

struct Inner<T> {
    transport: Arc<T>,
    poller: MetricsPoller<T>,
    state: watch::Sender<SessionSnapshot>,
    active: Mutex<Option<PollHandle>>,
}

impl<T> Inner<T> {
    /// Applies `f` only if `generation` is still current. Returns whether it was applied.
    fn apply(&self, generation: u64, f: impl FnOnce(&mut SessionSnapshot)) -> bool {
        let mut applied = false;
        self.state.send_if_modified(|s| {
            if s.generation != generation {
                return false;
            }
            f(s);
            applied = true;
            true
        });
        applied
    }

    fn active(&self) -> MutexGuard<'_, Option<PollHandle>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Coordinates ask → answer → metrics polling for one question at a time.
pub struct QuerySession<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for QuerySession<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: RagTransport> QuerySession<T> {
    pub fn new(transport: Arc<T>, policy: PollPolicy) -> Self {
        let poller = MetricsPoller::new(Arc::clone(&transport), policy);
        let (state, _) = watch::channel(SessionSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                transport,
                poller,
                state,
                active: Mutex::new(None),
            }),
        }
    }

    /// Current snapshot (cloned).
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Receiver that is notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    /// Asks `question`, replacing whatever the session showed before.
    ///
    /// Resolves once the answer is shown (or failed); metrics keep arriving
    /// in the background through [`subscribe`](Self::subscribe).
    pub async fn ask(&self, question: impl Into<String>) -> AskOutcome {
        let question = question.into().trim().to_string();
        if question.is_empty() {
            return AskOutcome::Ignored;
        }

        let mut generation = 0;
        self.inner.state.send_modify(|s| {
            generation = s.generation + 1;
            *s = SessionSnapshot {
                generation,
                phase: SessionPhase::AwaitingAnswer,
                question: Some(question.clone()),
                flags: LoadingFlags {
                    answer_pending: true,
                    metrics_pending: true,
                },
                ..SessionSnapshot::default()
            };
        });
        let previous = self.inner.active().take();
        if let Some(previous) = previous {
            previous.cancel();
        }
        info!(generation, question = %question, "ask started");

        match self.inner.transport.submit_question(&question).await {
            Ok(reply) => {
                let answer = reply
                    .answer
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or_else(|| NO_ANSWER_MESSAGE.to_string());
                let initial = self.inner.poller.initial_snapshot();

                let applied = self.inner.apply(generation, |s| {
                    s.phase = SessionPhase::AwaitingMetrics;
                    s.answer = Some(answer);
                    s.context = reply.context.unwrap_or_default();
                    s.reasoning = reply.reasoning;
                    s.metrics = Some(initial);
                    s.flags.answer_pending = false;
                    s.poll = PollState::Polling;
                });
                if !applied {
                    debug!(generation, "discarding answer for superseded question");
                    return AskOutcome::Superseded;
                }

                info!(generation, "answer ready; polling metrics");
                self.start_polling(generation, question);
                AskOutcome::Answered
            }
            Err(err) => {
                warn!(generation, error = %err, "answer request failed");
                let applied = self.inner.apply(generation, |s| {
                    s.phase = SessionPhase::Error;
                    s.answer = Some(ANSWER_ERROR_MESSAGE.to_string());
                    s.context.clear();
                    s.metrics = None;
                    s.reasoning = None;
                    s.flags = LoadingFlags::default();
                });
                if applied {
                    AskOutcome::Failed
                } else {
                    debug!(generation, "discarding failure for superseded question");
                    AskOutcome::Superseded
                }
            }
        }
    }

    /// Stops the current polling loop, if any. The session settles with the
    /// metrics merged so far.
    pub fn stop_metrics(&self) {
        if let Some(handle) = self.inner.active().take() {
            handle.cancel();
        }
    }

    fn start_polling(&self, generation: u64, question: String) {
        let sink = SessionSink {
            inner: Arc::clone(&self.inner),
            generation,
        };
        let handle = self.inner.poller.start(question, sink);

        let mut active = self.inner.active();
        if self.inner.state.borrow().generation != generation {
            handle.cancel();
            return;
        }
        if let Some(previous) = active.replace(handle) {
            previous.cancel();
        }
    }
}

/// Routes poll updates of one generation into the session.
struct SessionSink<T> {
    inner: Arc<Inner<T>>,
    generation: u64,
}

impl<T: RagTransport> PollSink for SessionSink<T> {
    fn publish(&mut self, update: PollUpdate) -> bool {
        self.inner.apply(self.generation, |s| {
            s.metrics = Some(update.metrics);
            if update.reasoning.is_some() {
                s.reasoning = update.reasoning;
            }
        })
    }

    fn finished(&mut self, report: &PollReport) {
        let settled = self.inner.apply(self.generation, |s| {
            s.phase = SessionPhase::Settled;
            s.flags.metrics_pending = false;
            s.poll = PollState::Stopped(report.reason);
        });
        if settled {
            info!(generation = self.generation, reason = ?report.reason, cycles = report.cycles, "session settled");
        }
    }
}
