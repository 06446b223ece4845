//! Line-oriented front end.
//!
//! Reads commands from stdin, hands them to the engine on spawned tasks and
//! lets a background renderer print whatever the session publishes. The
//! input loop never waits on the network, so a new question can always
//! supersede the running one.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use query_engine::{
    DocumentOutcome, DocumentSet, PollPolicy, PollState, QuerySession, SessionPhase,
    SessionSnapshot, StopReason,
};
use rag_api_client::{DocumentUpload, MetricsSnapshot, RagTransport};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::progress::{self, Progress};
use crate::render;

const HELP: &str = "\
Commands:
  ask <question>        ask a question (plain text works too)
  upload <path>...      upload files
  text <content>        upload raw text
  remove <name>         remove an uploaded file
  docs                  list uploaded files
  status                show the current question, answer and metrics
  help                  show this help
  quit | exit           leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    Upload(Vec<PathBuf>),
    Text(String),
    Remove(String),
    Docs,
    Status,
    Help,
    Quit,
    /// Known command with missing arguments.
    Usage(&'static str),
    Empty,
}

pub fn parse(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    match head.to_ascii_lowercase().as_str() {
        "ask" if rest.is_empty() => Command::Usage("ask <question>"),
        "ask" => Command::Ask(rest.to_string()),
        "upload" => Command::Upload(rest.split_whitespace().map(PathBuf::from).collect()),
        "text" if rest.is_empty() => Command::Usage("text <content>"),
        "text" => Command::Text(rest.to_string()),
        "remove" if rest.is_empty() => Command::Usage("remove <name>"),
        "remove" => Command::Remove(rest.to_string()),
        "docs" if rest.is_empty() => Command::Docs,
        "status" if rest.is_empty() => Command::Status,
        "help" if rest.is_empty() => Command::Help,
        "quit" | "exit" if rest.is_empty() => Command::Quit,
        _ => Command::Ask(line.to_string()),
    }
}

/// What the renderer has to print for a new snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    AnswerPending,
    Answer,
    Metrics,
    Settled(PollState),
}

/// Tracks what was already printed for the current question.
#[derive(Debug, Default)]
pub struct Renderer {
    generation: u64,
    answered: bool,
    metrics: Option<MetricsSnapshot>,
    reasoning: Option<String>,
    settled: bool,
}

impl Renderer {
    pub fn observe(&mut self, s: &SessionSnapshot) -> Vec<Frame> {
        let mut frames = Vec::new();
        if s.generation == 0 {
            return frames;
        }
        if s.generation != self.generation {
            *self = Renderer {
                generation: s.generation,
                ..Renderer::default()
            };
            if s.flags.answer_pending {
                frames.push(Frame::AnswerPending);
            }
        }
        if !self.answered && s.answer.is_some() {
            self.answered = true;
            frames.push(Frame::Answer);
        }
        match &s.metrics {
            Some(m) if self.metrics.as_ref() != Some(m) || self.reasoning != s.reasoning => {
                let first = self.metrics.is_none();
                self.metrics = Some(m.clone());
                self.reasoning = s.reasoning.clone();
                // The all-pending starting card carries nothing worth printing.
                let all_pending = m.iter().all(|(_, g)| g.is_pending());
                if !(first && all_pending) {
                    frames.push(Frame::Metrics);
                }
            }
            _ => {}
        }
        if s.phase == SessionPhase::Settled && !self.settled {
            self.settled = true;
            frames.push(Frame::Settled(s.poll));
        }
        frames
    }
}

async fn render_loop(mut rx: watch::Receiver<SessionSnapshot>) {
    let mut renderer = Renderer::default();
    let mut spinner: Option<Box<dyn Progress>> = None;
    let stop = |spinner: &mut Option<Box<dyn Progress>>| {
        if let Some(p) = spinner.take() {
            p.finish();
        }
    };

    while rx.changed().await.is_ok() {
        let snap = rx.borrow_and_update().clone();
        for frame in renderer.observe(&snap) {
            stop(&mut spinner);
            match frame {
                Frame::AnswerPending => {}
                Frame::Answer => print!("{}", render::answer(&snap)),
                Frame::Metrics => {
                    if let Some(m) = &snap.metrics {
                        print!("{}", render::metrics(m, snap.reasoning.as_deref()));
                    }
                }
                Frame::Settled(PollState::Stopped(StopReason::Resolved)) => {}
                Frame::Settled(state) => {
                    println!("{}", format!("Metrics incomplete ({state:?}).").yellow());
                }
            }
        }
        if spinner.is_none() {
            if snap.flags.answer_pending {
                spinner = Some(progress::spinner("Thinking..."));
            } else if snap.flags.metrics_pending {
                spinner = Some(progress::spinner("Computing metrics..."));
            }
        }
        if !snap.is_busy() {
            stop(&mut spinner);
        }
    }
    stop(&mut spinner);
}

async fn read_files(paths: &[PathBuf]) -> Result<Vec<DocumentUpload>> {
    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        let content = tokio::fs::read(path).await?;
        out.push(DocumentUpload::new(file_name(path), content));
    }
    Ok(out)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn report(outcome: DocumentOutcome) {
    if outcome.ok {
        println!("{}", outcome.message.green());
    } else {
        println!("{}", outcome.message.red());
    }
}

/// Runs the command loop until `quit` or end of input.
pub async fn run<T: RagTransport>(transport: Arc<T>, policy: PollPolicy) -> Result<()> {
    let session = QuerySession::new(Arc::clone(&transport), policy);
    let docs = Arc::new(DocumentSet::new(transport));
    let renderer = tokio::spawn(render_loop(session.subscribe()));

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = parse(&line);
        debug!(?command, "command");
        match command {
            Command::Empty => {}
            Command::Help => println!("{HELP}"),
            Command::Usage(usage) => println!("usage: {usage}"),
            Command::Quit => break,
            Command::Ask(question) => {
                let session = session.clone();
                tokio::spawn(async move {
                    session.ask(question).await;
                });
            }
            Command::Upload(paths) => {
                let files = match read_files(&paths).await {
                    Ok(files) => files,
                    Err(err) => {
                        warn!(error = %err, "reading files failed");
                        println!("{}", format!("Cannot read files: {err}").red());
                        continue;
                    }
                };
                let docs = Arc::clone(&docs);
                tokio::spawn(async move { report(docs.add(files).await) });
            }
            Command::Text(text) => {
                let docs = Arc::clone(&docs);
                tokio::spawn(async move { report(docs.add_texts(vec![text]).await) });
            }
            Command::Remove(name) => {
                let docs = Arc::clone(&docs);
                tokio::spawn(async move { report(docs.remove(&name).await) });
            }
            Command::Docs => print!("{}", render::documents(&docs.snapshot())),
            Command::Status => print!("{}", render::status(&session.snapshot())),
        }
    }

    session.stop_metrics();
    renderer.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_engine::LoadingFlags;
    use serde_json::json;

    #[test]
    fn commands_and_plain_questions() {
        assert_eq!(parse("  "), Command::Empty);
        assert_eq!(parse("ask What is X?"), Command::Ask("What is X?".into()));
        assert_eq!(parse("What is X?"), Command::Ask("What is X?".into()));
        assert_eq!(parse("ask"), Command::Usage("ask <question>"));
        assert_eq!(
            parse("upload a.pdf  docs/b.txt"),
            Command::Upload(vec!["a.pdf".into(), "docs/b.txt".into()])
        );
        assert_eq!(parse("upload"), Command::Upload(Vec::new()));
        assert_eq!(parse("remove doc1.pdf"), Command::Remove("doc1.pdf".into()));
        assert_eq!(parse("QUIT"), Command::Quit);
        // A known word followed by text is a question.
        assert_eq!(parse("status of the project?"), Command::Ask("status of the project?".into()));
    }

    fn snapshot(generation: u64) -> SessionSnapshot {
        SessionSnapshot {
            generation,
            phase: SessionPhase::AwaitingAnswer,
            question: Some("q".into()),
            flags: LoadingFlags {
                answer_pending: true,
                metrics_pending: true,
            },
            ..SessionSnapshot::default()
        }
    }

    #[test]
    fn renderer_prints_each_stage_once() {
        let mut r = Renderer::default();
        assert!(r.observe(&SessionSnapshot::default()).is_empty());

        let mut s = snapshot(1);
        assert_eq!(r.observe(&s), vec![Frame::AnswerPending]);

        s.phase = SessionPhase::AwaitingMetrics;
        s.answer = Some("a".into());
        s.flags.answer_pending = false;
        s.metrics = Some(serde_json::from_value(json!({"DeepEval": "Computing..."})).unwrap());
        assert_eq!(r.observe(&s), vec![Frame::Answer]);
        assert!(r.observe(&s).is_empty());

        s.metrics = Some(serde_json::from_value(json!({"DeepEval": {}})).unwrap());
        assert_eq!(r.observe(&s), vec![Frame::Metrics]);

        s.phase = SessionPhase::Settled;
        s.poll = PollState::Stopped(StopReason::Resolved);
        assert_eq!(r.observe(&s), vec![Frame::Settled(s.poll)]);
        assert!(r.observe(&s).is_empty());
    }

    #[test]
    fn refined_reasoning_reprints_metrics() {
        let mut r = Renderer::default();
        let mut s = snapshot(1);
        s.answer = Some("a".into());
        s.flags.answer_pending = false;
        s.reasoning = Some("initial".into());
        s.metrics = Some(serde_json::from_value(json!({"RAGAS": {"Faithfulness": 0.5}})).unwrap());
        assert_eq!(r.observe(&s), vec![Frame::AnswerPending, Frame::Answer, Frame::Metrics]);

        s.reasoning = Some("refined".into());
        assert_eq!(r.observe(&s), vec![Frame::Metrics]);
        assert!(r.observe(&s).is_empty());
    }

    #[test]
    fn new_generation_resets_renderer() {
        let mut r = Renderer::default();
        let mut s = snapshot(1);
        s.answer = Some("a".into());
        r.observe(&s);

        let s2 = snapshot(2);
        assert_eq!(r.observe(&s2), vec![Frame::AnswerPending]);
    }
}
