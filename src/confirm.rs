//! Destructive-operation confirmation.
//!
//! Catalog reloads and embedding rebuilds delete data before writing, so
//! the orchestrator gates them behind an injected confirmation capability.
//! Interactive runs prompt on stdin; automation passes `--yes`; tests
//! supply a fixed answer.

use std::io::{BufRead, Write};

/// The phrase an interactive operator must type to proceed.
const CONFIRM_PHRASE: &str = "I'm sure";

/// Decides whether a destructive action may proceed.
pub trait DestructiveConfirm: Send + Sync {
    /// `action` is a human-readable description of what is about to be
    /// deleted. Returns `true` to proceed.
    fn confirm(&self, action: &str) -> bool;
}

/// Prompts on stderr and requires the operator to type `I'm sure`.
pub struct StdinConfirm;

impl DestructiveConfirm for StdinConfirm {
    fn confirm(&self, action: &str) -> bool {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(
            stderr,
            "{} Type '{}' to continue: ",
            action, CONFIRM_PHRASE
        );
        let _ = stderr.flush();

        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        answer.trim() == CONFIRM_PHRASE
    }
}

/// Always proceeds; used for `--yes` in non-interactive automation.
pub struct AssumeYes;

impl DestructiveConfirm for AssumeYes {
    fn confirm(&self, _action: &str) -> bool {
        true
    }
}

#[cfg(test)]
pub struct AlwaysDeny;

#[cfg(test)]
impl DestructiveConfirm for AlwaysDeny {
    fn confirm(&self, _action: &str) -> bool {
        false
    }
}
