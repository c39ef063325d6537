//! Embedding progress reporting.
//!
//! The indexer reports one event per course so long rebuilds show how much
//! is left. Progress is informational only and never affects control flow.
//! It is emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event: `n` of `total` courses embedded for a school.
#[derive(Clone, Debug)]
pub struct EmbedProgressEvent {
    pub school: String,
    pub n: u64,
    pub total: u64,
}

/// Reports indexing progress. Implementations write to stderr.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: EmbedProgressEvent);
}

/// Human-friendly progress on stderr: "embed NCSU  1,234 / 5,000 courses".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: EmbedProgressEvent) {
        let line = format!(
            "embed {}  {} / {} courses\n",
            event.school,
            format_number(event.n),
            format_number(event.total)
        );
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: EmbedProgressEvent) {}
}

/// Progress mode for the CLI: off, or human-readable on stderr.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
        }
    }
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }
}
