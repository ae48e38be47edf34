//! Subcommand implementations.
//!
//! Each command returns a [`Summary`]; an unmet condition is a summary with
//! `satisfied == false`, not an error. Errors are reserved for bad input and
//! failures of the tool itself.

pub mod completions;
pub mod exec;
pub mod http;
pub mod probe;

use std::time::Duration;

use serde::Serialize;

/// Result of one subcommand run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub command: &'static str,
    pub satisfied: bool,
    pub attempts: u64,
    pub elapsed_ms: u64,
    pub message: String,
}

impl Summary {
    pub fn satisfied(command: &'static str, attempts: u64, elapsed: Duration, message: impl Into<String>) -> Self {
        Self {
            command,
            satisfied: true,
            attempts,
            elapsed_ms: millis(elapsed),
            message: message.into(),
        }
    }

    pub fn unsatisfied(command: &'static str, attempts: u64, elapsed: Duration, message: impl Into<String>) -> Self {
        Self {
            satisfied: false,
            ..Self::satisfied(command, attempts, elapsed, message)
        }
    }

    pub fn to_human(&self) -> String {
        if self.satisfied {
            self.message.clone()
        } else {
            format!(
                "{} (gave up after {} attempt(s) in {}ms)",
                self.message, self.attempts, self.elapsed_ms
            )
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Print `summary` to stdout, or to stderr when it is a human-readable failure
pub fn output(summary: &Summary, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary.to_json()).unwrap_or_default()
        );
    } else if summary.satisfied {
        println!("{}", summary.to_human());
    } else {
        eprintln!("{}", summary.to_human());
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
