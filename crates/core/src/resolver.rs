//! Condition resolution.
//!
//! Narrows a candidate row set to exactly one condition and derives the escalation verdict:
//!
//! 1. keep rows under exactly the chosen primary and sub category;
//! 2. flag rows whose second clarifying question was answered "Yes";
//! 3. a single flagged row wins; several flagged rows, or none, fall back to the highest acuity
//!    (among the flagged rows, or among all kept rows), earliest row first on ties;
//! 4. the result is high risk when its acuity is 3 or any risk was confirmed.
//!
//! An empty filtered set is `TriageError::NoMatch`; no row is ever picked arbitrarily.

use crate::knowledge_base::{filter_records, ConditionRecord};
use crate::{TriageError, TriageResult};
use serde::Serialize;
use std::collections::BTreeMap;
use triage_types::Answer;

/// The single condition chosen for a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedCondition {
    pub condition: ConditionRecord,
    pub is_high_risk: bool,
}

impl ResolvedCondition {
    /// Recommendation text selected by the high-risk verdict.
    pub fn recommendation(&self) -> &str {
        self.condition.recommendation(self.is_high_risk)
    }
}

/// Escalation verdict for a chosen row.
pub fn is_high_risk(condition: &ConditionRecord, confirmed_risks: &[String]) -> bool {
    condition.acuity_level.is_high() || !confirmed_risks.is_empty()
}

/// Runs steps 1 to 3 and returns the chosen row.
///
/// # Errors
///
/// Returns `TriageError::NoMatch` when no candidate sits under the given categories.
pub fn select_condition<'a, I>(
    candidates: I,
    primary_category: &str,
    sub_category: &str,
    clarifying_answers: &BTreeMap<String, Answer>,
) -> TriageResult<&'a ConditionRecord>
where
    I: IntoIterator<Item = &'a ConditionRecord>,
{
    let filtered = filter_records(candidates, primary_category, sub_category);
    if filtered.is_empty() {
        return Err(TriageError::NoMatch(format!(
            "no condition listed under {primary_category} / {sub_category}"
        )));
    }

    let flagged: Vec<&ConditionRecord> = filtered
        .iter()
        .copied()
        .filter(|row| {
            row.clarifying_question_2
                .as_deref()
                .and_then(|q| clarifying_answers.get(q))
                .is_some_and(|a| a.is_yes())
        })
        .collect();

    let chosen = match flagged.as_slice() {
        [only] => *only,
        [] => highest_acuity(&filtered),
        several => highest_acuity(several),
    };

    tracing::debug!(
        "resolved {} of {} candidates ({} flagged) to {}",
        primary_category,
        filtered.len(),
        flagged.len(),
        chosen.condition
    );
    Ok(chosen)
}

/// Runs all four steps.
///
/// # Errors
///
/// Returns `TriageError::NoMatch` when no candidate sits under the given categories.
pub fn resolve<'a, I>(
    candidates: I,
    primary_category: &str,
    sub_category: &str,
    clarifying_answers: &BTreeMap<String, Answer>,
    confirmed_risks: &[String],
) -> TriageResult<ResolvedCondition>
where
    I: IntoIterator<Item = &'a ConditionRecord>,
{
    let chosen = select_condition(candidates, primary_category, sub_category, clarifying_answers)?;
    Ok(ResolvedCondition {
        condition: chosen.clone(),
        is_high_risk: is_high_risk(chosen, confirmed_risks),
    })
}

/// First row with the maximum acuity. `rows` must be non-empty.
fn highest_acuity<'a>(rows: &[&'a ConditionRecord]) -> &'a ConditionRecord {
    let mut best = rows[0];
    for &row in &rows[1..] {
        if row.acuity_level > best.acuity_level {
            best = row;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_base::test_support::record;

    fn with_q2(mut r: ConditionRecord, q: &str) -> ConditionRecord {
        r.clarifying_question_2 = Some(q.to_string());
        r
    }

    fn answers(pairs: &[(&str, Answer)]) -> BTreeMap<String, Answer> {
        pairs.iter().map(|(q, a)| (q.to_string(), *a)).collect()
    }

    #[test]
    fn single_flagged_row_wins_over_higher_acuity() {
        let rows = vec![
            with_q2(record("Head", "Pain", "Severe", 3), "Sudden onset?"),
            with_q2(record("Head", "Pain", "Mild", 1), "Worse with stress?"),
        ];
        let chosen = select_condition(
            &rows,
            "Head",
            "Pain",
            &answers(&[("Sudden onset?", Answer::No), ("Worse with stress?", Answer::Yes)]),
        )
        .unwrap();
        assert_eq!(chosen.condition.as_str(), "Mild");
    }

    #[test]
    fn no_flagged_rows_picks_highest_acuity() {
        let rows = vec![
            record("Head", "Pain", "One", 1),
            record("Head", "Pain", "Three", 3),
            record("Head", "Pain", "Two", 2),
        ];
        let chosen = select_condition(&rows, "Head", "Pain", &BTreeMap::new()).unwrap();
        assert_eq!(chosen.condition.as_str(), "Three");
    }

    #[test]
    fn several_flagged_rows_pick_highest_acuity_among_flagged() {
        let rows = vec![
            record("Head", "Pain", "Unflagged", 3),
            with_q2(record("Head", "Pain", "FlaggedLow", 1), "Q?"),
            with_q2(record("Head", "Pain", "FlaggedMid", 2), "Q?"),
        ];
        let chosen =
            select_condition(&rows, "Head", "Pain", &answers(&[("Q?", Answer::Yes)])).unwrap();
        assert_eq!(chosen.condition.as_str(), "FlaggedMid");
    }

    #[test]
    fn acuity_ties_go_to_first_row() {
        let rows = vec![
            record("Head", "Pain", "First", 2),
            record("Head", "Pain", "Second", 2),
        ];
        let chosen = select_condition(&rows, "Head", "Pain", &BTreeMap::new()).unwrap();
        assert_eq!(chosen.condition.as_str(), "First");
    }

    #[test]
    fn rows_outside_the_categories_are_ignored() {
        let rows = vec![
            record("Head", "Other", "Elsewhere", 3),
            record("Head", "Pain", "Here", 1),
        ];
        let chosen = select_condition(&rows, "Head", "Pain", &BTreeMap::new()).unwrap();
        assert_eq!(chosen.condition.as_str(), "Here");
    }

    #[test]
    fn empty_filter_is_no_match() {
        let rows = vec![record("Head", "Pain", "Here", 1)];
        let err = resolve(&rows, "Chest", "Pain", &BTreeMap::new(), &[]).expect_err("no rows");
        assert!(matches!(err, TriageError::NoMatch(_)));
    }

    #[test]
    fn confirmed_risk_forces_high_risk_below_acuity_three() {
        let rows = vec![record("Fever", "General", "Viral", 1)];
        let resolved = resolve(
            &rows,
            "Fever",
            "General",
            &BTreeMap::new(),
            &["Diabetes".to_string()],
        )
        .unwrap();
        assert!(resolved.is_high_risk);
        assert_eq!(resolved.recommendation(), "Viral: escalated");
    }

    #[test]
    fn acuity_three_is_high_risk_without_risks() {
        let rows = vec![record("Chest", "Pain", "Heart Attack", 3)];
        let resolved = resolve(&rows, "Chest", "Pain", &BTreeMap::new(), &[]).unwrap();
        assert!(resolved.is_high_risk);
    }

    #[test]
    fn low_acuity_without_risks_uses_default_recommendation() {
        let rows = vec![record("Fever", "General", "Viral", 2)];
        let resolved = resolve(&rows, "Fever", "General", &BTreeMap::new(), &[]).unwrap();
        assert!(!resolved.is_high_risk);
        assert_eq!(resolved.recommendation(), "Viral: default");
    }
}
