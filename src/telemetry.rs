use std::io::{self, IsTerminal};

use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, filter, fmt};

/// Targets of this workspace; events from other crates are not rendered.
pub const TARGET_PREFIXES: &[&str] = &["askmydocs_client", "rag_api_client", "query_engine"];

/// RFC3339 UTC timer via `chrono`, e.g. `2025-09-12T10:20:30Z`.
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        w.write_str(&now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
    }
}

/// Workspace-scoped fmt layer writing to stderr.
///
/// - RFC3339 UTC timestamps
/// - compact single-line format with `file:line`
/// - ANSI colors only when stderr is a terminal
///
/// Logs go to stderr so they never interleave with rendered answers on stdout.
pub fn layer<S>() -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let use_ansi = io::stderr().is_terminal();
    let ours = filter::filter_fn(|meta| {
        TARGET_PREFIXES
            .iter()
            .any(|prefix| meta.target().starts_with(prefix))
    });

    fmt::layer()
        .with_writer(io::stderr)
        .with_timer(ChronoRfc3339Utc)
        .with_level(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(use_ansi)
        .event_format(fmt::format().compact().with_source_location(true))
        .with_filter(ours)
}

/// `RUST_LOG` if set. Otherwise `default` globally and `level` for the
/// workspace crates.
pub fn env_filter_with_level(default: &str, level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        TARGET_PREFIXES
            .iter()
            .filter_map(|prefix| {
                format!("{prefix}={}", level.as_str().to_lowercase())
                    .parse::<Directive>()
                    .ok()
            })
            .fold(EnvFilter::new(default), EnvFilter::add_directive)
    })
}
