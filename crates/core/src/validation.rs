//! Input validation utilities.
//!
//! These checks guard forward navigation: each returns `TriageError::Validation` with a message
//! that can be shown inline next to the offending field.

use crate::{TriageError, TriageResult};

/// Youngest age accepted at intake.
pub const MIN_AGE: u8 = 18;
/// Oldest age accepted at intake.
pub const MAX_AGE: u8 = 120;

/// Validates an intake age.
///
/// # Errors
///
/// Returns `TriageError::Validation` if the age is outside `MIN_AGE..=MAX_AGE`.
pub fn validate_age(age: u8) -> TriageResult<u8> {
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(TriageError::Validation(format!(
            "age must be between {MIN_AGE} and {MAX_AGE}"
        )));
    }
    Ok(age)
}

/// Validates free-text symptom input, returning it trimmed.
///
/// Text made only of whitespace and commas carries no symptom and is rejected.
pub fn validate_free_text(text: &str) -> TriageResult<String> {
    if text.split(',').all(|term| term.trim().is_empty()) {
        return Err(TriageError::Validation(
            "please enter at least one symptom to search".into(),
        ));
    }
    Ok(text.trim().to_string())
}

/// Validates that `choice` is one of `options`, returning the option's canonical text.
pub fn validate_choice<'a>(choice: &str, options: &[&'a str], what: &str) -> TriageResult<&'a str> {
    let choice = choice.trim();
    if choice.is_empty() {
        return Err(TriageError::Validation(format!("no {what} selected")));
    }
    options
        .iter()
        .copied()
        .find(|option| *option == choice)
        .ok_or_else(|| TriageError::Validation(format!("'{choice}' is not an offered {what}")))
}
