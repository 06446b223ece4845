//! Monotonic merge of metric snapshots.
//!
//! A poll reply may carry only some groups, and a group the backend already
//! reported can come back as the pending label. [`merge`] folds a reply into
//! the running snapshot so that a resolved group is never shown as pending
//! again, and a resolved metric or field is never dropped.

use std::collections::BTreeMap;

use rag_api_client::{MetricGroup, MetricsSnapshot};

/// Folds `incoming` into `previous`.
///
/// - groups only in `previous` are kept as-is;
/// - a pending group in `incoming` replaces `previous` only if that was
///   pending or absent;
/// - a resolved group in `incoming` of the same shape as the resolved group
///   in `previous` is laid over it: metrics are unioned and present fields
///   win over missing ones;
/// - a resolved group of a different shape replaces `previous` wholesale.
pub fn merge(previous: &MetricsSnapshot, incoming: &MetricsSnapshot) -> MetricsSnapshot {
    let mut out = previous.clone();
    for (name, next) in incoming.iter() {
        let merged = match previous.get(name) {
            Some(prev) if prev.is_resolved() && next.is_pending() => continue,
            Some(prev) if prev.is_resolved() => fill_group(prev, next),
            _ => next.clone(),
        };
        out.insert(name, merged);
    }
    out
}

fn fill_group(prev: &MetricGroup, next: &MetricGroup) -> MetricGroup {
    match (prev, next) {
        (MetricGroup::Scores(old), MetricGroup::Scores(new)) => {
            let mut scores = old.clone();
            for (name, score) in new {
                let known = scores.get(name).copied().flatten();
                scores.insert(name.clone(), score.or(known));
            }
            MetricGroup::Scores(scores)
        }
        (MetricGroup::Evaluation(old), MetricGroup::Evaluation(new)) => {
            let mut records: BTreeMap<_, _> = old.clone();
            for (name, record) in new {
                let filled = match records.get(name) {
                    Some(current) => current.filled_from(record),
                    None => record.clone(),
                };
                records.insert(name.clone(), filled);
            }
            MetricGroup::Evaluation(records)
        }
        _ => next.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snap(v: serde_json::Value) -> MetricsSnapshot {
        serde_json::from_value(v).expect("valid snapshot")
    }

    fn samples() -> Vec<MetricsSnapshot> {
        vec![
            MetricsSnapshot::new(),
            snap(json!({"DeepEval": "Computing...", "RAGAS": "Computing..."})),
            snap(json!({"DeepEval": "Computing...", "RAGAS": {"Faithfulness": 0.82}})),
            snap(json!({"DeepEval": {"CorrectnessMetric": {"value": 0.9, "pass": true}}})),
            snap(json!({
                "DeepEval": {"CorrectnessMetric": {"reason": "matches context"}},
                "RAGAS": {"Faithfulness": null, "ContextRecall": 0.5}
            })),
            snap(json!({"RAGAS": {"Faithfulness": {"value": 0.3}}, "Extra": "Computing..."})),
            snap(json!({"DeepEval": "Evaluation failed", "Extra": {"X": 1.0}})),
        ]
    }

    #[test]
    fn resolved_group_never_reverts_to_pending() {
        for p in samples() {
            for i in samples() {
                let merged = merge(&p, &i);
                for (name, group) in p.iter() {
                    if group.is_resolved() {
                        assert!(
                            merged.get(name).is_some_and(MetricGroup::is_resolved),
                            "group {name} regressed: {p:?} + {i:?}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn merging_the_same_reply_twice_is_a_no_op() {
        for p in samples() {
            for i in samples() {
                let once = merge(&p, &i);
                assert_eq!(merge(&once, &i), once, "{p:?} + {i:?}");
            }
        }
    }

    #[test]
    fn absent_groups_are_retained() {
        let prev = snap(json!({"DeepEval": "Computing...", "RAGAS": {"Faithfulness": 0.82}}));
        let merged = merge(&prev, &MetricsSnapshot::new());
        assert_eq!(merged, prev);
    }

    #[test]
    fn pending_fills_unknown_group() {
        let merged = merge(&MetricsSnapshot::new(), &snap(json!({"RAGAS": "Computing..."})));
        assert_eq!(merged.get("RAGAS"), Some(&MetricGroup::Pending));
    }

    #[test]
    fn partial_records_fill_in_field_by_field() {
        let first = snap(json!({"DeepEval": {"CorrectnessMetric": {"value": 0.9}}}));
        let second = snap(json!({"DeepEval": {
            "CorrectnessMetric": {"reason": "ok", "pass": true},
            "FluencyMetric": {"value": 0.7}
        }}));

        let merged = merge(&first, &second);
        let Some(MetricGroup::Evaluation(records)) = merged.get("DeepEval") else {
            panic!("expected evaluation group");
        };
        let correctness = &records["CorrectnessMetric"];
        assert_eq!(correctness.value, Some(0.9));
        assert_eq!(correctness.reason.as_deref(), Some("ok"));
        assert_eq!(correctness.pass, Some(true));
        assert!(records.contains_key("FluencyMetric"));
    }

    #[test]
    fn changed_shape_takes_incoming_group() {
        let first = snap(json!({"RAGAS": {"Faithfulness": 0.82}}));
        let second = snap(json!({"RAGAS": {
            "Faithfulness": {"value": 0.8, "reason": "grounded", "pass": true}
        }}));
        let merged = merge(&first, &second);
        assert_eq!(merged.get("RAGAS"), second.get("RAGAS"));

        let failed = snap(json!({"RAGAS": "Evaluation failed"}));
        let merged = merge(&merged, &failed);
        assert_eq!(
            merged.get("RAGAS"),
            Some(&MetricGroup::Label("Evaluation failed".into()))
        );
    }

    #[test]
    fn null_score_keeps_known_score() {
        let first = snap(json!({"RAGAS": {"Faithfulness": 0.82}}));
        let second = snap(json!({"RAGAS": {"Faithfulness": null, "ContextRecall": 0.4}}));
        let merged = merge(&first, &second);
        let Some(MetricGroup::Scores(scores)) = merged.get("RAGAS") else {
            panic!("expected score group");
        };
        assert_eq!(scores["Faithfulness"], Some(0.82));
        assert_eq!(scores["ContextRecall"], Some(0.4));
    }
}
