//! Free-text symptom matching against the knowledge base.
//!
//! Two matching paths exist:
//!
//! - **Phrase** ([`SymptomMatcher::match_by_symptoms`]): user input is split into
//!   comma-separated phrases and compared against each row's symptom phrases by substring
//!   containment or similarity ratio.
//! - **Anchored** ([`SymptomMatcher::match_free_text`]): user words are first compared with the
//!   words of each primary category label. Any overlap returns the rows of the overlapping
//!   categories straight away. Without an anchor, matching falls back to stem comparison of
//!   individual words ([`SymptomMatcher::match_by_stems`]).
//!
//! Every path returns rows in source order with duplicate rows removed. Blank input matches
//! nothing; callers must treat that as "no match", never as "everything matches".

use crate::constants::DEFAULT_MATCH_THRESHOLD;
use crate::knowledge_base::{primary_categories, ConditionRecord};
use crate::normalize::{normalize, stem, tokenize};
use crate::similarity::similarity;
use crate::TriageError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Which matching path the free-text flow uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// Category anchor words first, then per-word stem matching.
    #[default]
    Anchored,
    /// Comma-separated phrase matching only.
    Phrase,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStrategy::Anchored => f.write_str("anchored"),
            MatchStrategy::Phrase => f.write_str("phrase"),
        }
    }
}

impl FromStr for MatchStrategy {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anchored" => Ok(MatchStrategy::Anchored),
            "phrase" => Ok(MatchStrategy::Phrase),
            other => Err(TriageError::InvalidInput(format!(
                "unknown match strategy '{other}' (expected anchored or phrase)"
            ))),
        }
    }
}

/// Matches free-text symptoms to knowledge base rows.
#[derive(Clone, Copy, Debug)]
pub struct SymptomMatcher {
    threshold: f64,
}

impl Default for SymptomMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD)
    }
}

impl SymptomMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Runs the path selected by `strategy`.
    pub fn search<'a>(
        &self,
        strategy: MatchStrategy,
        free_text: &str,
        rows: &'a [ConditionRecord],
    ) -> Vec<&'a ConditionRecord> {
        let matched = match strategy {
            MatchStrategy::Phrase => self.match_by_symptoms(free_text, rows),
            MatchStrategy::Anchored => self.match_free_text(free_text, rows),
        };
        tracing::debug!(
            "{} match for {:?}: {} of {} rows",
            strategy,
            free_text,
            matched.len(),
            rows.len()
        );
        matched
    }

    /// Phrase matching.
    ///
    /// A row is included when any user phrase and any of its symptom phrases satisfy one of:
    /// one contains the other, or their similarity ratio is at least the threshold. Scanning of
    /// a row stops at its first matching phrase.
    pub fn match_by_symptoms<'a>(
        &self,
        free_text: &str,
        rows: &'a [ConditionRecord],
    ) -> Vec<&'a ConditionRecord> {
        let user_terms = normalize(free_text);
        if user_terms.is_empty() {
            return Vec::new();
        }

        let matched = rows.iter().filter(|row| {
            row.symptoms.iter().any(|symptom| {
                let row_term = symptom.trim().to_lowercase();
                !row_term.is_empty()
                    && user_terms
                        .iter()
                        .any(|user_term| self.phrases_match(user_term, &row_term))
            })
        });
        dedup_rows(matched)
    }

    fn phrases_match(&self, user_term: &str, row_term: &str) -> bool {
        user_term.contains(row_term)
            || row_term.contains(user_term)
            || similarity(user_term, row_term) >= self.threshold
    }

    /// The anchored free-text path: category anchor words, falling back to stem matching.
    pub fn match_free_text<'a>(
        &self,
        free_text: &str,
        rows: &'a [ConditionRecord],
    ) -> Vec<&'a ConditionRecord> {
        match self.match_by_anchor(free_text, rows) {
            Some(anchored) => {
                tracing::debug!("anchor words matched {} rows", anchored.len());
                anchored
            }
            None => self.match_by_stems(free_text, rows),
        }
    }

    /// Rows whose primary category label shares a word with the user's text.
    ///
    /// Returns `None` when no category label shares a word, so the caller can fall back.
    pub fn match_by_anchor<'a>(
        &self,
        free_text: &str,
        rows: &'a [ConditionRecord],
    ) -> Option<Vec<&'a ConditionRecord>> {
        let user_words: HashSet<String> = tokenize(free_text).into_iter().collect();
        if user_words.is_empty() {
            return None;
        }

        let anchored: Vec<&str> = primary_categories(rows)
            .into_iter()
            .filter(|category| tokenize(category).iter().any(|w| user_words.contains(w)))
            .collect();
        if anchored.is_empty() {
            return None;
        }

        Some(dedup_rows(
            rows.iter()
                .filter(|row| anchored.contains(&row.primary_category.as_str())),
        ))
    }

    /// Per-word stem matching.
    ///
    /// For each user phrase and each symptom phrase of a row, the row matches when any pair of
    /// their words has equal stems or one word contains the other, or when the stemmed phrases
    /// are at least `threshold` similar.
    pub fn match_by_stems<'a>(
        &self,
        free_text: &str,
        rows: &'a [ConditionRecord],
    ) -> Vec<&'a ConditionRecord> {
        let user_terms: Vec<StemmedPhrase> = normalize(free_text)
            .iter()
            .map(|t| StemmedPhrase::new(t))
            .filter(|p| !p.words.is_empty())
            .collect();
        if user_terms.is_empty() {
            return Vec::new();
        }

        let matched = rows.iter().filter(|row| {
            row.symptoms.iter().any(|symptom| {
                let row_phrase = StemmedPhrase::new(symptom);
                user_terms.iter().any(|user| self.stems_match(user, &row_phrase))
            })
        });
        dedup_rows(matched)
    }

    fn stems_match(&self, user: &StemmedPhrase, row: &StemmedPhrase) -> bool {
        let words_match = user.words.iter().any(|(user_word, user_stem)| {
            row.words.iter().any(|(row_word, row_stem)| {
                user_stem == row_stem || contains_either(user_word, row_word)
            })
        });
        words_match || similarity(&user.stem, &row.stem) >= self.threshold
    }
}

/// A phrase split into `(word, stem)` pairs plus the stem of the whole phrase.
struct StemmedPhrase {
    words: Vec<(String, String)>,
    stem: String,
}

impl StemmedPhrase {
    fn new(phrase: &str) -> Self {
        let words: Vec<String> = tokenize(phrase);
        let phrase_stem = stem(&words.join(" "));
        Self {
            words: words
                .into_iter()
                .map(|w| {
                    let s = stem(&w);
                    (w, s)
                })
                .collect(),
            stem: phrase_stem,
        }
    }
}

fn contains_either(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

/// Removes rows equal to an earlier row, keeping source order.
fn dedup_rows<'a>(rows: impl Iterator<Item = &'a ConditionRecord>) -> Vec<&'a ConditionRecord> {
    let mut out: Vec<&ConditionRecord> = Vec::new();
    for row in rows {
        if !out.iter().any(|seen| *seen == row) {
            out.push(row);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_base::test_support::{record, sample_kb};

    fn names<'a>(rows: &[&'a ConditionRecord]) -> Vec<&'a str> {
        rows.iter().map(|r| r.condition.as_str()).collect()
    }

    fn with_symptoms(mut r: ConditionRecord, symptoms: &[&str]) -> ConditionRecord {
        r.symptoms = symptoms.iter().map(|s| s.to_string()).collect();
        r
    }

    #[test]
    fn blank_input_matches_nothing_on_every_path() {
        let kb = sample_kb();
        let matcher = SymptomMatcher::default();
        for text in ["", "   ", ",", " , ,, "] {
            assert!(matcher.match_by_symptoms(text, kb.records()).is_empty());
            assert!(matcher.match_free_text(text, kb.records()).is_empty());
            assert!(matcher.match_by_stems(text, kb.records()).is_empty());
        }
    }

    #[test]
    fn phrase_match_uses_substring_containment() {
        let rows = vec![with_symptoms(
            record("Neuro", "Head", "Migraine", 2),
            &["headache", "nausea"],
        )];
        let matched = SymptomMatcher::default().match_by_symptoms("headache, fever", &rows);
        assert_eq!(names(&matched), vec!["Migraine"]);
    }

    #[test]
    fn phrase_match_contains_in_both_directions() {
        let rows = vec![with_symptoms(
            record("Neuro", "Head", "Cluster", 3),
            &["severe headache"],
        )];
        let matcher = SymptomMatcher::default();
        assert_eq!(matcher.match_by_symptoms("headache", &rows).len(), 1);
        assert_eq!(
            matcher
                .match_by_symptoms("really severe headache today", &rows)
                .len(),
            1
        );
    }

    #[test]
    fn phrase_match_uses_similarity_threshold() {
        let rows = vec![with_symptoms(
            record("GI", "Upper", "Gastritis", 1),
            &["nauseous"],
        )];
        // "nausea" vs "nauseous": 2*5/14 = 0.714
        assert_eq!(
            SymptomMatcher::new(0.65)
                .match_by_symptoms("nausea", &rows)
                .len(),
            1
        );
        assert!(SymptomMatcher::new(0.8)
            .match_by_symptoms("nausea", &rows)
            .is_empty());
    }

    #[test]
    fn phrase_match_keeps_source_order_and_drops_duplicates() {
        let a = with_symptoms(record("X", "Y", "A", 1), &["fever"]);
        let b = with_symptoms(record("X", "Y", "B", 1), &["chills"]);
        let rows = vec![a.clone(), b, a];
        let matched = SymptomMatcher::default().match_by_symptoms("chills, fever", &rows);
        assert_eq!(names(&matched), vec!["A", "B"]);
    }

    #[test]
    fn anchor_words_return_whole_category() {
        let kb = sample_kb();
        let matcher = SymptomMatcher::default();
        let matched = matcher
            .match_by_anchor("I have a bad headache", kb.records())
            .expect("Headache category should anchor");
        assert_eq!(
            names(&matched),
            vec!["Migraine", "Tension Headache", "Cluster Headache"]
        );
    }

    #[test]
    fn anchor_takes_precedence_over_symptom_matches() {
        let kb = sample_kb();
        // "fever" anchors the Fever category even though PID also lists fever as a symptom.
        let matched = SymptomMatcher::default().match_free_text("fever", kb.records());
        assert_eq!(names(&matched), vec!["Viral Fever"]);
    }

    #[test]
    fn no_anchor_falls_back_to_stems() {
        let kb = sample_kb();
        let matcher = SymptomMatcher::default();
        assert!(matcher.match_by_anchor("wheezed", kb.records()).is_none());
        let matched = matcher.match_free_text("wheezed", kb.records());
        assert_eq!(names(&matched), vec!["Asthma Attack"]);
    }

    #[test]
    fn stem_match_equates_inflections() {
        let rows = vec![with_symptoms(
            record("Resp", "Chest", "Bronchitis", 2),
            &["coughing"],
        )];
        let matched = SymptomMatcher::default().match_by_stems("coughs", &rows);
        assert_eq!(names(&matched), vec!["Bronchitis"]);
    }

    #[test]
    fn stem_match_accepts_raw_containment_of_short_words() {
        let rows = vec![
            with_symptoms(record("ENT", "Ear", "Otitis Media", 2), &["ear pain"]),
            with_symptoms(record("Eye", "Red", "Conjunctivitis", 1), &["itchy eyes"]),
        ];
        let matched = SymptomMatcher::default().match_by_stems("ea", &rows);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].condition.as_str(), "Otitis Media");
    }

    #[test]
    fn search_dispatches_by_strategy() {
        let kb = sample_kb();
        let matcher = SymptomMatcher::default();
        let phrase = matcher.search(MatchStrategy::Phrase, "fever", kb.records());
        assert_eq!(
            names(&phrase),
            vec!["Viral Fever", "Pelvic Inflammatory Disease"]
        );
        let anchored = matcher.search(MatchStrategy::Anchored, "fever", kb.records());
        assert_eq!(names(&anchored), vec!["Viral Fever"]);
    }

    #[test]
    fn strategy_parses_from_text() {
        assert_eq!(
            "Phrase".parse::<MatchStrategy>().unwrap(),
            MatchStrategy::Phrase
        );
        assert!("fuzzy".parse::<MatchStrategy>().is_err());
    }
}
