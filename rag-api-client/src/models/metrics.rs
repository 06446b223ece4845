//! Metric groups as reported by `/metrics`.
//!
//! On the wire a group is either the pending label (`"Computing..."`) or a
//! mapping of metric name to an evaluation record (`{value, reason, pass}`)
//! or to a bare score. Decoding resolves that shape once into
//! [`MetricGroup`], so nothing downstream sniffs JSON at read time.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Label the backend sends for a group that has not resolved yet.
pub const PENDING_SENTINEL: &str = "Computing...";

/// One evaluation-style metric. Any field may still be missing while the
/// backend fills the record in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalRecord {
    /// Score in `0.0..=1.0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Evaluator explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Threshold verdict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass: Option<bool>,
}

impl EvalRecord {
    /// Returns `true` once value, reason and verdict are all present.
    pub fn is_complete(&self) -> bool {
        self.value.is_some() && self.reason.is_some() && self.pass.is_some()
    }

    /// Fields present in `newer` win; fields it lacks keep their current value.
    pub fn filled_from(&self, newer: &EvalRecord) -> EvalRecord {
        EvalRecord {
            value: newer.value.or(self.value),
            reason: newer.reason.clone().or_else(|| self.reason.clone()),
            pass: newer.pass.or(self.pass),
        }
    }
}

/// State of a single named metric group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireGroup", into = "WireGroup")]
pub enum MetricGroup {
    /// Not resolved yet ([`PENDING_SENTINEL`] on the wire).
    Pending,
    /// Any other text the backend sends in place of a mapping, e.g. an
    /// evaluator failure. Resolved: it is final for the question.
    Label(String),
    /// Evaluation-style metrics (DeepEval): name -> record.
    Evaluation(BTreeMap<String, EvalRecord>),
    /// Similarity-style metrics (RAGAS): name -> score (`None` for a null score).
    Scores(BTreeMap<String, Option<f64>>),
}

impl MetricGroup {
    pub fn is_pending(&self) -> bool {
        matches!(self, MetricGroup::Pending)
    }

    pub fn is_resolved(&self) -> bool {
        !self.is_pending()
    }

    /// Evaluation view of a resolved group; scores become records with only `value` set.
    pub fn to_records(&self) -> BTreeMap<String, EvalRecord> {
        match self {
            MetricGroup::Pending | MetricGroup::Label(_) => BTreeMap::new(),
            MetricGroup::Evaluation(records) => records.clone(),
            MetricGroup::Scores(scores) => scores
                .iter()
                .map(|(name, score)| {
                    (
                        name.clone(),
                        EvalRecord {
                            value: *score,
                            ..EvalRecord::default()
                        },
                    )
                })
                .collect(),
        }
    }
}

/// Untagged wire form of a group.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireGroup {
    Label(String),
    Entries(BTreeMap<String, WireEntry>),
    /// Numbers, arrays, booleans: no usable group.
    Other(serde_json::Value),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireEntry {
    Score(Option<f64>),
    Record(EvalRecord),
    Other(serde_json::Value),
}

impl TryFrom<WireGroup> for MetricGroup {
    type Error = String;

    fn try_from(wire: WireGroup) -> Result<Self, Self::Error> {
        let entries = match wire {
            WireGroup::Label(label) if label == PENDING_SENTINEL => return Ok(MetricGroup::Pending),
            WireGroup::Label(label) => return Ok(MetricGroup::Label(label)),
            WireGroup::Other(value) => return Err(format!("unexpected metric group shape: {value}")),
            WireGroup::Entries(entries) => entries,
        };

        let has_records = entries.values().any(|e| matches!(e, WireEntry::Record(_)));
        if has_records {
            let records = entries
                .into_iter()
                .filter_map(|(name, entry)| match entry {
                    WireEntry::Record(r) => Some((name, r)),
                    WireEntry::Score(value) => Some((
                        name,
                        EvalRecord {
                            value,
                            ..EvalRecord::default()
                        },
                    )),
                    WireEntry::Other(_) => None,
                })
                .collect();
            Ok(MetricGroup::Evaluation(records))
        } else {
            let scores = entries
                .into_iter()
                .filter_map(|(name, entry)| match entry {
                    WireEntry::Score(value) => Some((name, value)),
                    _ => None,
                })
                .collect();
            Ok(MetricGroup::Scores(scores))
        }
    }
}

impl From<MetricGroup> for WireGroup {
    fn from(group: MetricGroup) -> Self {
        match group {
            MetricGroup::Pending => WireGroup::Label(PENDING_SENTINEL.to_string()),
            MetricGroup::Label(label) => WireGroup::Label(label),
            MetricGroup::Evaluation(records) => WireGroup::Entries(
                records
                    .into_iter()
                    .map(|(k, r)| (k, WireEntry::Record(r)))
                    .collect(),
            ),
            MetricGroup::Scores(scores) => WireGroup::Entries(
                scores
                    .into_iter()
                    .map(|(k, v)| (k, WireEntry::Score(v)))
                    .collect(),
            ),
        }
    }
}

/// Mapping from group name to group state.
///
/// A `null` group, or one that is neither a label nor a mapping, is treated
/// as absent so the other groups of the reply still count.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricsSnapshot(BTreeMap<String, MetricGroup>);

impl<'de> Deserialize<'de> for MetricsSnapshot {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Option<WireGroup>>::deserialize(deserializer)?;
        Ok(Self(
            raw.into_iter()
                .filter_map(|(name, wire)| {
                    let group = MetricGroup::try_from(wire?).ok()?;
                    Some((name, group))
                })
                .collect(),
        ))
    }
}

impl MetricsSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot with every given group marked pending.
    pub fn pending_for<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            names
                .into_iter()
                .map(|n| (n.into(), MetricGroup::Pending))
                .collect(),
        )
    }

    pub fn get(&self, name: &str) -> Option<&MetricGroup> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, group: MetricGroup) {
        self.0.insert(name.into(), group);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricGroup)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names from `expected` that are missing or still pending.
    pub fn pending_groups<'a>(&self, expected: &'a [String]) -> Vec<&'a str> {
        expected
            .iter()
            .filter(|name| self.get(name).is_none_or(MetricGroup::is_pending))
            .map(String::as_str)
            .collect()
    }

    /// `true` when every expected group is present and resolved.
    ///
    /// An empty snapshot never counts as done unless nothing is expected.
    pub fn all_resolved(&self, expected: &[String]) -> bool {
        self.pending_groups(expected).is_empty()
    }
}

impl FromIterator<(String, MetricGroup)> for MetricsSnapshot {
    fn from_iter<T: IntoIterator<Item = (String, MetricGroup)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
