//! Assertion-style helpers for building poll conditions.
//!
//! Each helper returns `Err(Mismatch)` instead of panicking, so a condition
//! can be written as a sequence of `?`-chained checks and its last failure
//! message is what the poller reports.

use std::fmt;

use crate::error::Mismatch;

/// Fail with `message` unless `condition` holds
pub fn check(condition: bool, message: impl fmt::Display) -> Result<(), Mismatch> {
    if condition {
        Ok(())
    } else {
        Err(Mismatch::new(message.to_string()))
    }
}

/// Fail unless `actual == expected`
pub fn check_eq<T>(actual: &T, expected: &T, context: impl fmt::Display) -> Result<(), Mismatch>
where
    T: PartialEq + fmt::Debug + ?Sized,
{
    if actual == expected {
        Ok(())
    } else {
        Err(Mismatch::new(format!(
            "{context}: expected [{expected:?}], got [{actual:?}]"
        )))
    }
}

/// Fail if `actual == unexpected`
pub fn check_ne<T>(actual: &T, unexpected: &T, context: impl fmt::Display) -> Result<(), Mismatch>
where
    T: PartialEq + fmt::Debug + ?Sized,
{
    if actual == unexpected {
        Err(Mismatch::new(format!(
            "{context}: expected a value different from [{unexpected:?}], got [{actual:?}]"
        )))
    } else {
        Ok(())
    }
}

/// Fail unless `haystack` contains `needle`
pub fn check_contains(haystack: &str, needle: &str, context: impl fmt::Display) -> Result<(), Mismatch> {
    if haystack.contains(needle) {
        Ok(())
    } else {
        Err(Mismatch::new(format!(
            "{context}: [{needle}] not found in [{}]",
            truncate(haystack, 200)
        )))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_owned(),
    }
}
