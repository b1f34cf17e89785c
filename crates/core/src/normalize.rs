//! Free-text normalisation for symptom matching.
//!
//! Two splitting modes are provided: [`normalize`] keeps comma-separated phrases intact, while
//! [`tokenize`] breaks text into bare lowercase words. [`stem`] applies a single-pass suffix
//! strip and must never be fed its own output.

use crate::constants::STEM_SUFFIXES;

/// Splits on commas, trims each term and lowercases it. Empty terms are dropped.
pub fn normalize(text: &str) -> Vec<String> {
    text.split(',')
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}

/// Lowercases, strips everything outside letters and whitespace, then splits on whitespace.
///
/// Apostrophes are removed outright so that `Women's` becomes `womens`. Any other
/// non-letter (commas, digits, hyphens) is treated as a word boundary.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '\'' | '\u{2019}'))
        .map(|c| {
            if c.is_alphabetic() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .map(str::to_lowercase)
        .collect()
}

/// Removes the first suffix from [`STEM_SUFFIXES`] that the word ends with.
pub fn stem(word: &str) -> String {
    let word = word.trim().to_lowercase();
    for suffix in STEM_SUFFIXES {
        if word.ends_with(suffix) {
            return word[..word.len() - suffix.len()].to_string();
        }
    }
    word
}
