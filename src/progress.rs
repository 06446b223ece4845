//! Loading indicators for the terminal front end.
//!
//! `IndicatifProgress` draws a spinner on a TTY; `NoopProgress` is used when
//! stdout is piped so output stays clean.

use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub trait Progress: Send + Sync {
    /// Stop and clear the indicator.
    fn finish(&self) {}
}

#[derive(Default, Clone, Copy)]
pub struct NoopProgress;
impl Progress for NoopProgress {}

pub struct IndicatifProgress {
    pb: ProgressBar,
}

impl IndicatifProgress {
    pub fn spinner(msg: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("-\\|/ ");
        pb.set_style(style);
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        Self { pb }
    }
}

impl Progress for IndicatifProgress {
    fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

/// Spinner on a terminal, no-op otherwise.
pub fn spinner(msg: &str) -> Box<dyn Progress> {
    if io::stdout().is_terminal() {
        Box::new(IndicatifProgress::spinner(msg))
    } else {
        Box::new(NoopProgress)
    }
}
