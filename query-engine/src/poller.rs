//! Metrics polling loop.
//!
//! One loop per question: call `/metrics`, fold the reply into the running
//! snapshot with [`merge`], hand the result to a [`PollSink`], then decide
//! whether to stop. Between cycles the loop sleeps for a fixed interval
//! (no backoff, no jitter). The sleep and the in-flight request are both
//! cancellation points.
//!
//! The loop stops when:
//! - every expected group is resolved ([`StopReason::Resolved`]),
//! - a poll request fails ([`StopReason::TransportFailed`], never retried),
//! - the poll ceiling is reached ([`StopReason::Exhausted`]),
//! - it is cancelled or its sink rejects an update ([`StopReason::Cancelled`]).

use std::sync::Arc;
use std::time::Duration;

use rag_api_client::{MetricsSnapshot, RagTransport};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cfg::{DEFAULT_MAX_POLLS, DEFAULT_POLL_INTERVAL_MS, default_groups};
use crate::merge::merge;

/// Timing and termination knobs for one polling loop.
#[derive(Clone, Debug, PartialEq)]
pub struct PollPolicy {
    /// Delay between the end of one cycle and the start of the next.
    pub interval: Duration,
    /// Hard ceiling on poll requests per question.
    pub max_polls: u32,
    /// Groups that must all resolve before the loop stops on its own.
    pub expected_groups: Vec<String>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_polls: DEFAULT_MAX_POLLS,
            expected_groups: default_groups(),
        }
    }
}

/// Lifecycle of a polling loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PollState {
    /// No loop started for the current question.
    #[default]
    Idle,
    Polling,
    Stopped(StopReason),
}

/// Why a loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Resolved,
    TransportFailed,
    Exhausted,
    Cancelled,
}

/// Merged state after one cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct PollUpdate {
    /// 1-based cycle number.
    pub cycle: u32,
    pub metrics: MetricsSnapshot,
    pub reasoning: Option<String>,
}

/// Final result of a loop.
#[derive(Clone, Debug, PartialEq)]
pub struct PollReport {
    pub reason: StopReason,
    /// Poll requests issued (including a failed one).
    pub cycles: u32,
    /// Last merged snapshot.
    pub metrics: MetricsSnapshot,
}

/// Receiver of loop progress.
pub trait PollSink: Send + 'static {
    /// Publishes a merged snapshot. Returning `false` marks the loop as stale
    /// and stops it without further requests.
    fn publish(&mut self, update: PollUpdate) -> bool;

    /// Called once when a spawned loop stops.
    fn finished(&mut self, _report: &PollReport) {}
}

/// Runs polling loops against a shared transport.
pub struct MetricsPoller<T> {
    transport: Arc<T>,
    policy: PollPolicy,
}

impl<T> Clone for MetricsPoller<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            policy: self.policy.clone(),
        }
    }
}

impl<T: RagTransport> MetricsPoller<T> {
    pub fn new(transport: Arc<T>, policy: PollPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Snapshot a loop starts from: every expected group pending.
    pub fn initial_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot::pending_for(self.policy.expected_groups.iter().cloned())
    }

    /// Spawns a loop for `question` on the Tokio runtime.
    ///
    /// The returned handle cancels the loop, reports its state and yields the
    /// final [`PollReport`].
    pub fn start<S: PollSink>(&self, question: String, mut sink: S) -> PollHandle {
        let poller = self.clone();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let (state_tx, state_rx) = watch::channel(PollState::Polling);

        let join = tokio::spawn(async move {
            let report = poller.run(&question, &token, &mut sink).await;
            state_tx.send_replace(PollState::Stopped(report.reason));
            sink.finished(&report);
            report
        });

        PollHandle {
            cancel,
            state: state_rx,
            join,
        }
    }

    /// Runs a loop on the current task until it stops.
    pub async fn run<S: PollSink>(
        &self,
        question: &str,
        cancel: &CancellationToken,
        sink: &mut S,
    ) -> PollReport {
        let expected = &self.policy.expected_groups;
        let max_polls = self.policy.max_polls.max(1);
        let mut snapshot = self.initial_snapshot();
        let mut cycles = 0u32;

        info!(question, max_polls, "metrics polling started");

        let reason = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            cycles += 1;
            let reply = tokio::select! {
                biased;
                _ = cancel.cancelled() => break StopReason::Cancelled,
                reply = self.transport.poll_metrics(question) => reply,
            };

            let reply = match reply {
                Ok(reply) => reply,
                Err(err) => {
                    warn!(question, cycle = cycles, error = %err, "metrics poll failed; stopping");
                    break StopReason::TransportFailed;
                }
            };

            snapshot = merge(&snapshot, &reply.partial());
            let update = PollUpdate {
                cycle: cycles,
                metrics: snapshot.clone(),
                reasoning: reply.reasoning,
            };
            if !sink.publish(update) {
                debug!(question, cycle = cycles, "poll update rejected as stale");
                break StopReason::Cancelled;
            }

            let pending = snapshot.pending_groups(expected);
            if pending.is_empty() {
                break StopReason::Resolved;
            }
            if cycles >= max_polls {
                warn!(question, cycles, ?pending, "metrics poll ceiling reached");
                break StopReason::Exhausted;
            }
            debug!(question, cycle = cycles, ?pending, "metrics still computing");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break StopReason::Cancelled,
                _ = tokio::time::sleep(self.policy.interval) => {}
            }
        };

        info!(question, cycles, ?reason, "metrics polling stopped");
        PollReport {
            reason,
            cycles,
            metrics: snapshot,
        }
    }
}

/// Handle to a spawned polling loop.
#[derive(Debug)]
pub struct PollHandle {
    cancel: CancellationToken,
    state: watch::Receiver<PollState>,
    join: JoinHandle<PollReport>,
}

impl PollHandle {
    /// Requests the loop to stop at its next cancellation point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for the loop to stop.
    pub async fn join(self) -> PollReport {
        match self.join.await {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, "metrics polling task did not complete");
                PollReport {
                    reason: StopReason::Cancelled,
                    cycles: 0,
                    metrics: MetricsSnapshot::new(),
                }
            }
        }
    }
}
