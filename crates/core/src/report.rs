//! Results view and plain-text report export.

use crate::constants::{NO_CLEAR_MATCH, REPORT_FILE_PREFIX};
use crate::resolver::ResolvedCondition;
use crate::session::SessionAnswers;
use crate::{TriageError, TriageResult};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Why the shown recommendation was chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rationale {
    /// Acuity level 3.
    SeverityIndicators,
    /// At least one risk flag was confirmed.
    RiskFactors,
    GeneralAdvice,
    /// Every clarifying answer was "No" and nothing escalated the case.
    NoClearMatch,
}

impl Rationale {
    pub fn label(self) -> &'static str {
        match self {
            Rationale::SeverityIndicators => "Due to severity indicators",
            Rationale::RiskFactors => "Based on my assessment and your pre-existing health status",
            Rationale::GeneralAdvice => "General advice",
            Rationale::NoClearMatch => {
                "I couldn't find a clear match for your symptoms, which could mean they're mild or need professional evaluation"
            }
        }
    }
}

/// What the results step shows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub headline: String,
    pub rationale: Rationale,
    pub recommendation: String,
    pub referral: Option<String>,
    pub is_high_risk: bool,
}

impl Outcome {
    pub fn assess(answers: &SessionAnswers, resolved: &ResolvedCondition) -> Self {
        let all_no = !answers.clarifying_answers.is_empty() && !answers.any_yes();
        let rationale = if !answers.confirmed_risks.is_empty() {
            Rationale::RiskFactors
        } else if resolved.condition.acuity_level.is_high() {
            Rationale::SeverityIndicators
        } else if all_no {
            Rationale::NoClearMatch
        } else {
            Rationale::GeneralAdvice
        };

        let headline = if rationale == Rationale::NoClearMatch {
            NO_CLEAR_MATCH.to_string()
        } else {
            resolved.condition.condition.to_string()
        };

        Self {
            headline,
            rationale,
            recommendation: resolved.recommendation().to_string(),
            referral: resolved.condition.referral.clone(),
            is_high_risk: resolved.is_high_risk,
        }
    }
}

/// A rendered plain-text report and its suggested file name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Report {
    pub file_name: String,
    pub text: String,
}

impl Report {
    /// Renders the report for a resolved session, dated `date`.
    pub fn render(answers: &SessionAnswers, resolved: &ResolvedCondition, date: NaiveDate) -> Self {
        let (age, gender) = match &answers.demographics {
            Some(d) => (d.age.to_string(), d.gender.to_string()),
            None => ("N/A".to_string(), "N/A".to_string()),
        };
        let risks = if answers.confirmed_risks.is_empty() {
            "None".to_string()
        } else {
            answers.confirmed_risks.join(", ")
        };

        let text = format!(
            "SYMPTOM CHECKER REPORT\n\
             ======================\n\
             \n\
             Patient Details:\n\
             - Age: {age}\n\
             - Gender: {gender}\n\
             \n\
             Assessment:\n\
             - Likely Condition: {condition}\n\
             - Risk Factors: {risks}\n\
             \n\
             Recommendation:\n\
             {recommendation}\n",
            condition = resolved.condition.condition,
            recommendation = resolved.recommendation(),
        );

        Self {
            file_name: format!("{REPORT_FILE_PREFIX}{}.txt", date.format("%Y%m%d")),
            text,
        }
    }

    /// Writes the report into `dir`, returning the full path.
    pub fn write_to(&self, dir: &Path) -> TriageResult<PathBuf> {
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.text).map_err(TriageError::ReportWrite)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_base::test_support::record;
    use crate::session::Demographics;
    use triage_types::{Answer, Gender};

    fn resolved(acuity: u8, is_high_risk: bool) -> ResolvedCondition {
        let mut condition = record("Headache", "Throbbing", "Migraine", acuity);
        condition.referral = Some("Neurology clinic".into());
        ResolvedCondition {
            condition,
            is_high_risk,
        }
    }

    fn answers() -> SessionAnswers {
        SessionAnswers {
            demographics: Some(Demographics {
                age: 34,
                gender: Gender::Female,
                existing_conditions: "asthma".into(),
            }),
            ..SessionAnswers::default()
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()
    }

    #[test]
    fn report_lists_patient_condition_and_default_advice() {
        let report = Report::render(&answers(), &resolved(2, false), date());
        assert_eq!(report.file_name, "triage_report_20260309.txt");
        assert!(report.text.contains("- Age: 34"));
        assert!(report.text.contains("- Gender: Female"));
        assert!(report.text.contains("- Likely Condition: Migraine"));
        assert!(report.text.contains("- Risk Factors: None"));
        assert!(report.text.contains("Migraine: default"));
    }

    #[test]
    fn report_joins_risks_and_escalates() {
        let mut a = answers();
        a.confirmed_risks = vec!["Pregnancy".into(), "Over 50".into()];
        let report = Report::render(&a, &resolved(2, true), date());
        assert!(report.text.contains("- Risk Factors: Pregnancy, Over 50"));
        assert!(report.text.contains("Migraine: escalated"));
    }

    #[test]
    fn report_without_demographics_uses_placeholders() {
        let report = Report::render(&SessionAnswers::default(), &resolved(1, false), date());
        assert!(report.text.contains("- Age: N/A"));
        assert!(report.text.contains("- Gender: N/A"));
    }

    #[test]
    fn report_writes_into_directory() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let report = Report::render(&answers(), &resolved(1, false), date());
        let path = report.write_to(dir.path()).expect("write report");
        assert_eq!(std::fs::read_to_string(path).unwrap(), report.text);
    }

    #[test]
    fn all_no_answers_without_risk_is_no_clear_match() {
        let mut a = answers();
        a.clarifying_answers.insert("Q1?".into(), Answer::No);
        let outcome = Outcome::assess(&a, &resolved(1, false));
        assert_eq!(outcome.headline, "No Clear Match");
        assert_eq!(outcome.rationale, Rationale::NoClearMatch);
        assert_eq!(outcome.referral.as_deref(), Some("Neurology clinic"));
    }

    #[test]
    fn high_acuity_is_never_no_clear_match() {
        let mut a = answers();
        a.clarifying_answers.insert("Q1?".into(), Answer::No);
        let outcome = Outcome::assess(&a, &resolved(3, true));
        assert_eq!(outcome.headline, "Migraine");
        assert_eq!(outcome.rationale, Rationale::SeverityIndicators);
        assert_eq!(outcome.recommendation, "Migraine: escalated");
    }

    #[test]
    fn confirmed_risks_take_the_risk_rationale() {
        let mut a = answers();
        a.clarifying_answers.insert("Q1?".into(), Answer::Yes);
        a.confirmed_risks = vec!["Smoker".into()];
        let outcome = Outcome::assess(&a, &resolved(1, true));
        assert_eq!(outcome.rationale, Rationale::RiskFactors);
        assert!(outcome.is_high_risk);
    }

    #[test]
    fn yes_answer_low_acuity_is_general_advice() {
        let mut a = answers();
        a.clarifying_answers.insert("Q1?".into(), Answer::Yes);
        let outcome = Outcome::assess(&a, &resolved(1, false));
        assert_eq!(outcome.rationale, Rationale::GeneralAdvice);
        assert_eq!(outcome.recommendation, "Migraine: default");
    }
}
