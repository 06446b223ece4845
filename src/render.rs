//! Plain-text rendering of session and document snapshots.

use std::fmt::Write;

use colored::Colorize;
use query_engine::{DocumentsSnapshot, SessionPhase, SessionSnapshot};
use rag_api_client::{EvalRecord, MetricGroup, MetricsSnapshot, PENDING_SENTINEL};

/// `0.823` -> `82.3%`.
pub fn percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Strips a trailing `Metric` from evaluator names (`FaithfulnessMetric` -> `Faithfulness`).
pub fn display_name(name: &str) -> &str {
    match name.strip_suffix("Metric") {
        Some(short) if !short.is_empty() => short,
        _ => name,
    }
}

fn verdict(pass: Option<bool>) -> String {
    match pass {
        Some(true) => "Pass".green().to_string(),
        Some(false) => "Fail".red().to_string(),
        None => PENDING_SENTINEL.to_string(),
    }
}

fn record_row(name: &str, r: &EvalRecord) -> String {
    let score = r.value.map(percent).unwrap_or_else(|| PENDING_SENTINEL.to_string());
    let reason = r.reason.as_deref().unwrap_or(PENDING_SENTINEL);
    format!("  {:<22} {:>8}  {}  {}", display_name(name), score, verdict(r.pass), reason)
}

/// Renders the metrics card: one block per group.
pub fn metrics(snapshot: &MetricsSnapshot, reasoning: Option<&str>) -> String {
    let mut out = String::new();
    if !snapshot.is_empty() {
        let _ = writeln!(out, "{}", "Evaluation Metrics".bold());
    }
    for (group, value) in snapshot.iter() {
        match value {
            MetricGroup::Pending => {
                let _ = writeln!(out, "{}: {}", group.bold(), PENDING_SENTINEL.dimmed());
            }
            MetricGroup::Label(label) => {
                let _ = writeln!(out, "{}: {}", group.bold(), label.yellow());
            }
            MetricGroup::Evaluation(records) => {
                let _ = writeln!(out, "{}", group.bold());
                for (name, record) in records {
                    let _ = writeln!(out, "{}", record_row(name, record));
                }
            }
            MetricGroup::Scores(scores) => {
                let _ = writeln!(out, "{}", group.bold());
                for (name, score) in scores {
                    let shown = score.map(percent).unwrap_or_else(|| PENDING_SENTINEL.to_string());
                    let _ = writeln!(out, "  {name:<22} {shown:>8}");
                }
            }
        }
    }
    if let Some(reasoning) = reasoning.filter(|r| !r.trim().is_empty()) {
        let _ = writeln!(out, "{}", "Reasoning:".bold());
        let _ = writeln!(out, "{reasoning}");
    }
    out
}

/// Question, answer and retrieved context.
pub fn answer(s: &SessionSnapshot) -> String {
    let mut out = String::new();
    if let Some(q) = &s.question {
        let _ = writeln!(out, "{} {q}", "Q:".cyan().bold());
    }
    match (&s.answer, s.phase) {
        (Some(a), SessionPhase::Error) => {
            let _ = writeln!(out, "{} {}", "A:".cyan().bold(), a.red());
        }
        (Some(a), _) => {
            let _ = writeln!(out, "{} {a}", "A:".cyan().bold());
        }
        (None, _) => {}
    }
    if !s.context.is_empty() {
        let _ = writeln!(out, "{}", "Context:".dimmed());
        for chunk in &s.context {
            let _ = writeln!(out, "  - {}", chunk.dimmed());
        }
    }
    out
}

/// Full dump used by the `status` command.
pub fn status(s: &SessionSnapshot) -> String {
    let mut out = format!(
        "phase: {:?}  poll: {:?}  answer pending: {}  metrics pending: {}\n",
        s.phase, s.poll, s.flags.answer_pending, s.flags.metrics_pending
    );
    out.push_str(&answer(s));
    if let Some(m) = &s.metrics {
        out.push_str(&metrics(m, s.reasoning.as_deref()));
    }
    out
}

pub fn documents(d: &DocumentsSnapshot) -> String {
    if d.names.is_empty() {
        return "No documents uploaded.\n".to_string();
    }
    let mut out = String::new();
    for name in &d.names {
        let _ = writeln!(out, "  {name}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snap(v: serde_json::Value) -> MetricsSnapshot {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn percent_has_one_decimal() {
        assert_eq!(percent(0.82), "82.0%");
        assert_eq!(percent(0.8234), "82.3%");
        assert_eq!(percent(1.0), "100.0%");
    }

    #[test]
    fn metric_suffix_is_stripped() {
        assert_eq!(display_name("FaithfulnessMetric"), "Faithfulness");
        assert_eq!(display_name("Metric"), "Metric");
        assert_eq!(display_name("faithfulness"), "faithfulness");
    }

    #[test]
    fn missing_fields_render_as_computing() {
        colored::control::set_override(false);
        let out = metrics(
            &snap(json!({
                "DeepEval": {"CorrectnessMetric": {"value": 0.9}},
                "RAGAS": "Computing..."
            })),
            None,
        );
        let row = out
            .lines()
            .find(|l| l.contains("Correctness"))
            .expect("row rendered");
        assert!(row.contains("90.0%"));
        assert_eq!(row.matches(PENDING_SENTINEL).count(), 2);
        assert!(out.contains("RAGAS: Computing..."));
        assert!(!out.contains("Reasoning:"));
    }

    #[test]
    fn verdicts_and_reasoning() {
        colored::control::set_override(false);
        let out = metrics(
            &snap(json!({
                "DeepEval": {
                    "AMetric": {"value": 0.5, "reason": "ok", "pass": true},
                    "BMetric": {"value": 0.1, "reason": "bad", "pass": false}
                },
                "RAGAS": {"faithfulness": 0.82}
            })),
            Some("grounded in context"),
        );
        assert!(out.contains("Pass"));
        assert!(out.contains("Fail"));
        assert!(out.contains("82.0%"));
        assert!(out.ends_with("Reasoning:\ngrounded in context\n"));
    }

    #[test]
    fn backend_label_is_printed_verbatim() {
        colored::control::set_override(false);
        let out = metrics(&snap(json!({"DeepEval": "Evaluation failed"})), None);
        assert!(out.contains("DeepEval: Evaluation failed"));
        assert!(!out.contains(PENDING_SENTINEL));
    }

    #[test]
    fn empty_document_list() {
        assert_eq!(documents(&DocumentsSnapshot::default()), "No documents uploaded.\n");
    }
}
