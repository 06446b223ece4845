//! Runtime configuration loaded from environment variables.

use std::time::Duration;

use crate::error::EngineError;
use crate::poller::PollPolicy;

/// Default poll delay.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
/// Default poll ceiling: five minutes at the default interval.
pub const DEFAULT_MAX_POLLS: u32 = 150;
/// Groups the backend reports when `METRICS_GROUPS` is unset.
pub const DEFAULT_METRIC_GROUPS: &[&str] = &["DeepEval", "RAGAS"];

/// Config bag for the engine. All fields have defaults via `from_env`.
#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    pub poll: PollPolicy,
}

impl EngineConfig {
    /// Build from environment variables with defaults.
    ///
    /// # Env
    /// - `METRICS_POLL_INTERVAL_MS` (u64, > 0)
    /// - `METRICS_MAX_POLLS` (u32, at least 1)
    /// - `METRICS_GROUPS` (comma-separated, at least one name)
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_vars(|k| std::env::var(k).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable lookup.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, EngineError> {
        let interval_ms = parse::<u64>(&var, "METRICS_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;
        if interval_ms == 0 {
            return Err(EngineError::InvalidNumber {
                var: "METRICS_POLL_INTERVAL_MS",
                reason: "must be > 0",
            });
        }
        let max_polls = parse::<u32>(&var, "METRICS_MAX_POLLS", DEFAULT_MAX_POLLS)?;
        if max_polls == 0 {
            return Err(EngineError::InvalidNumber {
                var: "METRICS_MAX_POLLS",
                reason: "must be at least 1",
            });
        }

        let expected_groups = match var("METRICS_GROUPS") {
            Some(raw) => parse_groups(&raw),
            None => default_groups(),
        };
        if expected_groups.is_empty() {
            return Err(EngineError::NoMetricGroups("METRICS_GROUPS"));
        }

        Ok(Self {
            poll: PollPolicy {
                interval: Duration::from_millis(interval_ms),
                max_polls,
                expected_groups,
            },
        })
    }
}

pub(crate) fn default_groups() -> Vec<String> {
    DEFAULT_METRIC_GROUPS.iter().map(|s| s.to_string()).collect()
}

/// Splits a comma-separated group list, dropping blanks and duplicates.
pub fn parse_groups(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    out
}

fn parse<T: std::str::FromStr>(
    var: impl Fn(&str) -> Option<String>,
    k: &'static str,
    dflt: T,
) -> Result<T, EngineError> {
    match var(k) {
        Some(v) if !v.trim().is_empty() => v.trim().parse().map_err(|_| EngineError::InvalidNumber {
            var: k,
            reason: "not a valid unsigned integer",
        }),
        _ => Ok(dflt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_are_trimmed_and_deduplicated() {
        assert_eq!(
            parse_groups(" DeepEval, RAGAS ,,DeepEval,Custom "),
            vec!["DeepEval", "RAGAS", "Custom"]
        );
        assert!(parse_groups(" , ").is_empty());
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = EngineConfig::from_vars(vars(&[("METRICS_POLL_INTERVAL_MS", "0")])).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidNumber {
                var: "METRICS_POLL_INTERVAL_MS",
                ..
            }
        ));
    }

    #[test]
    fn zero_polls_and_empty_groups_are_rejected() {
        assert!(EngineConfig::from_vars(vars(&[("METRICS_MAX_POLLS", "0")])).is_err());
        assert!(matches!(
            EngineConfig::from_vars(vars(&[("METRICS_GROUPS", " , ")])),
            Err(EngineError::NoMetricGroups(_))
        ));
    }

    #[test]
    fn values_are_read_from_vars() {
        let cfg = EngineConfig::from_vars(vars(&[
            ("METRICS_POLL_INTERVAL_MS", " 500 "),
            ("METRICS_MAX_POLLS", "3"),
            ("METRICS_GROUPS", "RAGAS"),
        ]))
        .unwrap();
        assert_eq!(cfg.poll.interval, Duration::from_millis(500));
        assert_eq!(cfg.poll.max_polls, 3);
        assert_eq!(cfg.poll.expected_groups, vec!["RAGAS"]);
        assert!(EngineConfig::from_vars(vars(&[("METRICS_MAX_POLLS", "many")])).is_err());
    }

    #[test]
    fn defaults_match_backend() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.poll.interval, Duration::from_millis(DEFAULT_POLL_INTERVAL_MS));
        assert_eq!(cfg.poll.max_polls, DEFAULT_MAX_POLLS);
        assert_eq!(cfg.poll.expected_groups, vec!["DeepEval", "RAGAS"]);
    }
}
