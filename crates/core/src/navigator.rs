//! Questionnaire state machine.
//!
//! A [`Navigator`] drives one user session through the triage steps:
//!
//! ```text
//! welcome -> user_info -> symptom_category -> symptom_subcategory -> symptom_selection
//!                              |                    ^
//!                              v                    |
//!                    symptom_free_input -> symptom_category_freeinput
//!
//! symptom_selection -> clarifying_questions(first) [-> clarifying_questions(second)]
//!                   -> risk_flag_selection -> results
//! ```
//!
//! `fallback` is reachable by escalation from the free-text steps and the clarifying
//! questions, and whenever the resolver cannot find a condition. `start_over` returns to
//! `welcome` from anywhere and discards every answer.
//!
//! Forward moves are looked up in [`transition`]; a move the table does not list is rejected
//! with `TriageError::InvalidInput` before any answer is touched. Going back is always
//! allowed. Answers collected after the step being revisited are left in place and
//! overwritten on the next forward pass, except the clarifying and risk answers, which are
//! reset each time symptom selection is submitted.

use crate::constants::NO_RISK_LABEL;
use crate::failure_log::{FailureLog, FailureReason};
use crate::gender::{check_gender_allowed, is_gender_allowed};
use crate::knowledge_base::{
    filter_records, primary_categories, subcategories, ConditionRecord, KnowledgeBase,
};
use crate::matcher::{MatchStrategy, SymptomMatcher};
use crate::report::{Outcome, Report};
use crate::resolver::{resolve, select_condition, ResolvedCondition};
use crate::session::{Demographics, SessionAnswers};
use crate::validation::{validate_age, validate_choice, validate_free_text};
use crate::{TriageError, TriageResult};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use triage_types::{Answer, Gender};

// ============================================================================
// STEPS AND EVENTS
// ============================================================================

/// The two sub-stages of the clarifying questions step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClarifyingStage {
    /// Every distinct first question across the candidate rows.
    First,
    /// Every distinct second question; only entered after a "Yes" in the first stage.
    Second,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Welcome,
    UserInfo,
    SymptomCategory,
    SymptomFreeInput,
    SymptomCategoryFreeInput,
    SymptomSubcategory,
    SymptomSelection,
    ClarifyingQuestions(ClarifyingStage),
    RiskFlagSelection,
    Results,
    Fallback,
}

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Step::Welcome => "welcome",
            Step::UserInfo => "user_info",
            Step::SymptomCategory => "symptom_category",
            Step::SymptomFreeInput => "symptom_free_input",
            Step::SymptomCategoryFreeInput => "symptom_category_freeinput",
            Step::SymptomSubcategory => "symptom_subcategory",
            Step::SymptomSelection => "symptom_selection",
            Step::ClarifyingQuestions(_) => "clarifying_questions",
            Step::RiskFlagSelection => "risk_flag_selection",
            Step::Results => "results",
            Step::Fallback => "fallback",
        }
    }

    /// What the user is asked at this step.
    pub fn prompt(self) -> &'static str {
        match self {
            Step::Welcome => "Hi, I'm here to help you make sense of your symptoms.",
            Step::UserInfo => "Before we begin, I'd like to know a little about you.",
            Step::SymptomCategory => "Let's start with what's bothering you today.",
            Step::SymptomFreeInput => {
                "What are your symptoms? Separate them with commas, e.g. headache, fever, nausea."
            }
            Step::SymptomCategoryFreeInput => "Let's find the right category for your symptoms.",
            Step::SymptomSubcategory => "Select a subcategory within your chosen category.",
            Step::SymptomSelection => "Tell me more about your symptoms. Select all that apply.",
            Step::ClarifyingQuestions(_) => {
                "Before I continue, I'd like to understand a bit more about your symptoms."
            }
            Step::RiskFlagSelection => {
                "Some factors can increase the significance of your symptoms. Select those that apply, or 'None' if none do."
            }
            Step::Results => "Your personalised recommendation.",
            Step::Fallback => {
                "I couldn't find a clear match for your symptoms. Would you like to speak with a doctor about this?"
            }
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::ClarifyingQuestions(ClarifyingStage::Second) => {
                f.write_str("clarifying_questions (second stage)")
            }
            other => f.write_str(other.name()),
        }
    }
}

/// Forward events. Going back and starting over are handled outside the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Begin,
    IntakeCompleted,
    CategoryChosen,
    FreeInputRequested,
    SymptomsSearched,
    RetrySearch,
    SubcategoryChosen,
    SymptomsSelected,
    FollowUpNeeded,
    Clarified,
    Escalated,
    RisksConfirmed,
}

/// The forward transition table.
pub fn transition(step: Step, event: Event) -> Option<Step> {
    use ClarifyingStage::{First, Second};
    use Event::*;

    let next = match (step, event) {
        (Step::Welcome, Begin) => Step::UserInfo,
        (Step::UserInfo, IntakeCompleted) => Step::SymptomCategory,
        (Step::SymptomCategory, CategoryChosen) => Step::SymptomSubcategory,
        (Step::SymptomCategory, FreeInputRequested) => Step::SymptomFreeInput,
        (Step::SymptomFreeInput, SymptomsSearched) => Step::SymptomCategoryFreeInput,
        (Step::SymptomFreeInput, Escalated) => Step::Fallback,
        (Step::SymptomCategoryFreeInput, CategoryChosen) => Step::SymptomSubcategory,
        (Step::SymptomCategoryFreeInput, RetrySearch) => Step::SymptomFreeInput,
        (Step::SymptomCategoryFreeInput, Escalated) => Step::Fallback,
        (Step::SymptomSubcategory, SubcategoryChosen) => Step::SymptomSelection,
        (Step::SymptomSelection, SymptomsSelected) => Step::ClarifyingQuestions(First),
        (Step::ClarifyingQuestions(First), FollowUpNeeded) => Step::ClarifyingQuestions(Second),
        (Step::ClarifyingQuestions(_), Clarified) => Step::RiskFlagSelection,
        (Step::ClarifyingQuestions(_), Escalated) => Step::Fallback,
        (Step::RiskFlagSelection, RisksConfirmed) => Step::Results,
        (Step::Fallback, RetrySearch) => Step::SymptomFreeInput,
        _ => return None,
    };
    Some(next)
}

// ============================================================================
// INPUTS AND VIEWS
// ============================================================================

/// Risk flags ticked by the user, plus the "None / Not Applicable" box.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RiskSelection {
    pub flags: Vec<String>,
    pub none: bool,
}

/// Everything a front end needs to render the current step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub step: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<ClarifyingStage>,
    pub prompt: &'static str,
    /// Categories, symptoms, questions or risk flags, depending on the step.
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

// ============================================================================
// NAVIGATOR
// ============================================================================

/// One user's questionnaire session.
///
/// The knowledge base is shared read-only; everything else belongs to this session alone.
#[derive(Clone, Debug)]
pub struct Navigator {
    kb: Arc<KnowledgeBase>,
    matcher: SymptomMatcher,
    strategy: MatchStrategy,
    failure_log: Option<FailureLog>,
    step: Step,
    answers: SessionAnswers,
    reached_second_stage: bool,
    fallback_origin: Option<Step>,
    provisional: Option<ConditionRecord>,
    resolved: Option<ResolvedCondition>,
}

impl Navigator {
    pub fn new(kb: Arc<KnowledgeBase>, matcher: SymptomMatcher, strategy: MatchStrategy) -> Self {
        Self {
            kb,
            matcher,
            strategy,
            failure_log: None,
            step: Step::Welcome,
            answers: SessionAnswers::new(),
            reached_second_stage: false,
            fallback_origin: None,
            provisional: None,
            resolved: None,
        }
    }

    /// Attaches the log that records sessions ending without a usable match.
    pub fn with_failure_log(mut self, log: FailureLog) -> Self {
        self.failure_log = Some(log);
        self
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn answers(&self) -> &SessionAnswers {
        &self.answers
    }

    pub fn resolved(&self) -> Option<&ResolvedCondition> {
        self.resolved.as_ref()
    }

    fn next_step(&self, event: Event) -> TriageResult<Step> {
        transition(self.step, event).ok_or_else(|| {
            TriageError::InvalidInput(format!("{event:?} is not allowed at {}", self.step))
        })
    }

    fn move_to(&mut self, next: Step) -> Step {
        tracing::debug!("session step {} -> {}", self.step, next);
        self.step = next;
        next
    }

    fn log_failure(&self, reason: FailureReason, detail: &str) {
        if let Some(log) = &self.failure_log {
            log.record_or_log(reason, detail);
        }
    }

    fn require_gender(&self) -> TriageResult<Gender> {
        self.answers
            .gender()
            .ok_or_else(|| TriageError::Validation("gender not selected, please go back".into()))
    }

    fn require_primary(&self) -> TriageResult<&str> {
        self.answers.primary_category.as_deref().ok_or_else(|| {
            TriageError::Validation("primary category not selected, please start over".into())
        })
    }

    fn require_sub(&self) -> TriageResult<&str> {
        self.answers.sub_category.as_deref().ok_or_else(|| {
            TriageError::Validation("subcategory not selected, please go back".into())
        })
    }

    /// Rows under the chosen primary and sub category, in source order.
    fn filtered_rows(&self) -> Vec<&ConditionRecord> {
        match (&self.answers.primary_category, &self.answers.sub_category) {
            (Some(primary), Some(sub)) => {
                filter_records(self.answers.candidate_rows(&self.kb), primary, sub)
            }
            _ => Vec::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Options shown at each step
    // ------------------------------------------------------------------------

    /// Primary categories offered at `symptom_category` or `symptom_category_freeinput`.
    pub fn category_options(&self) -> Vec<String> {
        let Some(gender) = self.answers.gender() else {
            return Vec::new();
        };
        let rows: &[ConditionRecord] = match self.step {
            Step::SymptomCategoryFreeInput => &self.answers.matched_subset,
            _ => self.kb.records(),
        };
        primary_categories(rows)
            .into_iter()
            .filter(|c| is_gender_allowed(c, gender))
            .map(str::to_string)
            .collect()
    }

    /// Sub categories of the chosen primary category within the candidate rows.
    pub fn subcategory_options(&self) -> Vec<String> {
        match &self.answers.primary_category {
            Some(primary) => subcategories(self.answers.candidate_rows(&self.kb), primary)
                .into_iter()
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Union of symptoms across the filtered rows, case-insensitively de-duplicated.
    pub fn symptom_options(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for row in self.filtered_rows() {
            for symptom in &row.symptoms {
                if !out.iter().any(|s| s.eq_ignore_ascii_case(symptom)) {
                    out.push(symptom.clone());
                }
            }
        }
        out
    }

    /// Questions asked in the given clarifying stage, distinct, in row order.
    pub fn clarifying_questions(&self, stage: ClarifyingStage) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for row in self.filtered_rows() {
            let question = match stage {
                ClarifyingStage::First => &row.clarifying_question_1,
                ClarifyingStage::Second => &row.clarifying_question_2,
            };
            if let Some(q) = question {
                if !out.contains(q) {
                    out.push(q.clone());
                }
            }
        }
        out
    }

    /// Risk flags of the provisionally selected condition.
    pub fn risk_options(&self) -> Vec<String> {
        self.provisional
            .as_ref()
            .map(|c| c.risk_flags.clone())
            .unwrap_or_default()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.resolved
            .as_ref()
            .map(|r| Outcome::assess(&self.answers, r))
    }

    /// The exportable report, once the session has been resolved.
    pub fn report(&self, date: NaiveDate) -> Option<Report> {
        self.resolved
            .as_ref()
            .map(|r| Report::render(&self.answers, r, date))
    }

    pub fn view(&self) -> StepView {
        let (stage, options) = match self.step {
            Step::SymptomCategory | Step::SymptomCategoryFreeInput => {
                (None, self.category_options())
            }
            Step::SymptomSubcategory => (None, self.subcategory_options()),
            Step::SymptomSelection => (None, self.symptom_options()),
            Step::ClarifyingQuestions(stage) => (Some(stage), self.clarifying_questions(stage)),
            Step::RiskFlagSelection => {
                let mut flags = self.risk_options();
                flags.push(NO_RISK_LABEL.to_string());
                (None, flags)
            }
            _ => (None, Vec::new()),
        };
        StepView {
            step: self.step.name(),
            stage,
            prompt: self.step.prompt(),
            options,
            outcome: if self.step == Step::Results {
                self.outcome()
            } else {
                None
            },
        }
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    pub fn begin(&mut self) -> TriageResult<Step> {
        let next = self.next_step(Event::Begin)?;
        Ok(self.move_to(next))
    }

    /// Records intake answers.
    ///
    /// # Errors
    ///
    /// - `TriageError::Validation` if no gender is given or the age is out of range
    pub fn submit_user_info(
        &mut self,
        age: u8,
        gender: Option<Gender>,
        existing_conditions: &str,
    ) -> TriageResult<Step> {
        let next = self.next_step(Event::IntakeCompleted)?;
        let gender = gender.ok_or_else(|| TriageError::Validation("gender not selected".into()))?;
        let age = validate_age(age)?;

        self.answers.demographics = Some(Demographics {
            age,
            gender,
            existing_conditions: existing_conditions.trim().to_string(),
        });
        Ok(self.move_to(next))
    }

    /// Picks a primary category from the taxonomy grid or from the free-text matches.
    ///
    /// # Errors
    ///
    /// - `TriageError::Validation` if gender is missing or the category is not offered
    /// - `TriageError::GenderRestriction` if the category is reserved for the other gender
    pub fn select_category(&mut self, category: &str) -> TriageResult<Step> {
        let next = self.next_step(Event::CategoryChosen)?;
        let gender = self.require_gender()?;
        check_gender_allowed(category.trim(), gender)?;

        let options = self.category_options();
        let option_refs: Vec<&str> = options.iter().map(String::as_str).collect();
        let chosen = validate_choice(category, &option_refs, "category")?.to_string();

        if self.step == Step::SymptomCategory {
            self.answers.free_input_mode = false;
            self.answers.free_text_symptoms = None;
            self.answers.matched_subset.clear();
        }
        self.answers.primary_category = Some(chosen);
        Ok(self.move_to(next))
    }

    pub fn request_free_input(&mut self) -> TriageResult<Step> {
        let next = self.next_step(Event::FreeInputRequested)?;
        self.answers.free_input_mode = true;
        Ok(self.move_to(next))
    }

    /// Searches the knowledge base with free-text symptoms.
    ///
    /// On success the matching rows become the session's candidate subset.
    ///
    /// # Errors
    ///
    /// - `TriageError::Validation` for blank input
    /// - `TriageError::NoMatch` when nothing matches (or nothing the user's gender allows);
    ///   the session stays on the free-text step so the user can retry or escalate
    pub fn submit_free_text(&mut self, text: &str) -> TriageResult<Step> {
        let next = self.next_step(Event::SymptomsSearched)?;
        let gender = self.require_gender()?;
        let text = validate_free_text(text)?;

        let matched: Vec<ConditionRecord> = self
            .matcher
            .search(self.strategy, &text, self.kb.records())
            .into_iter()
            .cloned()
            .collect();

        let offered = primary_categories(&matched)
            .into_iter()
            .any(|c| is_gender_allowed(c, gender));
        if !offered {
            self.log_failure(FailureReason::NoSymptomMatch, &text);
            return Err(TriageError::NoMatch(format!(
                "no conditions match '{text}'"
            )));
        }

        self.answers.free_text_symptoms = Some(text);
        self.answers.matched_subset = matched;
        Ok(self.move_to(next))
    }

    /// Goes back to the free-text entry from the matched categories or the fallback screen.
    pub fn retry_search(&mut self) -> TriageResult<Step> {
        let next = self.next_step(Event::RetrySearch)?;
        self.answers.free_input_mode = true;
        self.fallback_origin = None;
        Ok(self.move_to(next))
    }

    /// Routes the session to the human-escalation screen.
    pub fn escalate(&mut self) -> TriageResult<Step> {
        let next = self.next_step(Event::Escalated)?;
        let origin = self.step;
        self.log_failure(
            FailureReason::EscalatedToDoctor,
            &format!("requested at {origin}"),
        );
        self.fallback_origin = Some(origin);
        Ok(self.move_to(next))
    }

    pub fn select_subcategory(&mut self, sub_category: &str) -> TriageResult<Step> {
        let next = self.next_step(Event::SubcategoryChosen)?;
        self.require_primary()?;

        let options = self.subcategory_options();
        let option_refs: Vec<&str> = options.iter().map(String::as_str).collect();
        let chosen = validate_choice(sub_category, &option_refs, "subcategory")?.to_string();

        self.answers.sub_category = Some(chosen);
        Ok(self.move_to(next))
    }

    /// Records the symptoms that apply. At least one must be chosen from the offered list.
    pub fn select_symptoms(&mut self, symptoms: &[String]) -> TriageResult<Step> {
        let next = self.next_step(Event::SymptomsSelected)?;
        self.require_primary()?;
        self.require_sub()?;

        let options = self.symptom_options();
        let mut selected: Vec<String> = Vec::new();
        for symptom in symptoms {
            let symptom = symptom.trim();
            if symptom.is_empty() {
                continue;
            }
            let canonical = options
                .iter()
                .find(|o| o.eq_ignore_ascii_case(symptom))
                .ok_or_else(|| {
                    TriageError::Validation(format!("'{symptom}' is not an offered symptom"))
                })?;
            if !selected.contains(canonical) {
                selected.push(canonical.clone());
            }
        }
        if selected.is_empty() {
            return Err(TriageError::Validation(
                "select at least one symptom".into(),
            ));
        }

        self.answers.selected_symptoms = selected;
        self.answers.clear_clarifying();
        self.reached_second_stage = false;
        self.provisional = None;
        self.resolved = None;
        Ok(self.move_to(next))
    }

    /// Answers every question of the current clarifying stage.
    ///
    /// After the first stage, the second stage follows only if some answer was "Yes" and the
    /// candidate rows carry second questions. Otherwise the resolver runs straight away: a
    /// chosen condition leads to risk flag selection, an unresolvable one to `fallback`.
    ///
    /// # Errors
    ///
    /// - `TriageError::Validation` if a question is unanswered or an unknown question is given
    pub fn answer_clarifying(&mut self, answers: &BTreeMap<String, Answer>) -> TriageResult<Step> {
        let Step::ClarifyingQuestions(stage) = self.step else {
            return Err(TriageError::InvalidInput(format!(
                "clarifying answers are not accepted at {}",
                self.step
            )));
        };

        let questions = self.clarifying_questions(stage);
        if let Some(unknown) = answers.keys().find(|q| !questions.contains(q)) {
            return Err(TriageError::Validation(format!(
                "'{unknown}' was not asked"
            )));
        }
        let unanswered: Vec<&str> = questions
            .iter()
            .filter(|q| !answers.contains_key(*q))
            .map(String::as_str)
            .collect();
        if !unanswered.is_empty() {
            return Err(TriageError::Validation(format!(
                "please answer: {}",
                unanswered.join("; ")
            )));
        }

        if stage == ClarifyingStage::First {
            // A new first-stage answer set invalidates whatever the second stage collected.
            let second = self.clarifying_questions(ClarifyingStage::Second);
            self.answers
                .clarifying_answers
                .retain(|q, _| !second.contains(q) || questions.contains(q));
            self.reached_second_stage = false;
        }
        for (question, answer) in answers {
            self.answers
                .clarifying_answers
                .insert(question.clone(), *answer);
        }

        let any_yes = answers.values().any(|a| a.is_yes());
        if stage == ClarifyingStage::First
            && any_yes
            && !self.clarifying_questions(ClarifyingStage::Second).is_empty()
        {
            let next = self.next_step(Event::FollowUpNeeded)?;
            self.reached_second_stage = true;
            return Ok(self.move_to(next));
        }

        self.run_resolver()
    }

    fn run_resolver(&mut self) -> TriageResult<Step> {
        let primary = self.require_primary()?.to_string();
        let sub = self.require_sub()?.to_string();

        let chosen = select_condition(
            self.answers.candidate_rows(&self.kb),
            &primary,
            &sub,
            &self.answers.clarifying_answers,
        )
        .cloned();

        match chosen {
            Ok(condition) => {
                let next = self.next_step(Event::Clarified)?;
                self.provisional = Some(condition);
                Ok(self.move_to(next))
            }
            Err(TriageError::NoMatch(reason)) => {
                let next = self.next_step(Event::Escalated)?;
                self.log_failure(FailureReason::UnresolvedCondition, &reason);
                self.fallback_origin = Some(self.step);
                Ok(self.move_to(next))
            }
            Err(e) => Err(e),
        }
    }

    /// Confirms risk flags and resolves the session.
    ///
    /// "None" always wins: if it is ticked together with specific flags, the flags are
    /// discarded and a warning is returned alongside the new step.
    ///
    /// # Errors
    ///
    /// - `TriageError::Validation` if nothing is ticked or a flag was not offered
    pub fn select_risks(
        &mut self,
        selection: &RiskSelection,
    ) -> TriageResult<(Step, Option<String>)> {
        let next = self.next_step(Event::RisksConfirmed)?;
        let primary = self.require_primary()?.to_string();
        let sub = self.require_sub()?.to_string();

        let offered = self.risk_options();
        let mut none = selection.none;
        let mut flags: Vec<String> = Vec::new();
        for flag in &selection.flags {
            let flag = flag.trim();
            if flag.eq_ignore_ascii_case(NO_RISK_LABEL) || flag.eq_ignore_ascii_case("none") {
                none = true;
                continue;
            }
            let canonical = offered
                .iter()
                .find(|o| o.eq_ignore_ascii_case(flag))
                .ok_or_else(|| {
                    TriageError::Validation(format!("'{flag}' is not an offered risk factor"))
                })?;
            if !flags.contains(canonical) {
                flags.push(canonical.clone());
            }
        }

        if flags.is_empty() && !none {
            return Err(TriageError::Validation(
                "select the risk factors that apply, or None".into(),
            ));
        }

        let warning = if none && !flags.is_empty() {
            tracing::warn!(
                "risk selection ticked None together with {} flags; None takes precedence",
                flags.len()
            );
            Some(format!(
                "'{NO_RISK_LABEL}' was selected together with other risk factors; they were ignored"
            ))
        } else {
            None
        };
        let confirmed = if none { Vec::new() } else { flags };

        let resolved = resolve(
            self.answers.candidate_rows(&self.kb),
            &primary,
            &sub,
            &self.answers.clarifying_answers,
            &confirmed,
        )?;

        self.answers.confirmed_risks = confirmed;
        self.resolved = Some(resolved);
        Ok((self.move_to(next), warning))
    }

    /// Moves one step back. Always permitted; at `welcome` it stays put.
    pub fn back(&mut self) -> Step {
        let target = match self.step {
            Step::Welcome | Step::UserInfo => Step::Welcome,
            Step::SymptomCategory => Step::UserInfo,
            Step::SymptomFreeInput => Step::SymptomCategory,
            Step::SymptomCategoryFreeInput => Step::SymptomFreeInput,
            Step::SymptomSubcategory => {
                if self.answers.free_input_mode {
                    Step::SymptomCategoryFreeInput
                } else {
                    Step::SymptomCategory
                }
            }
            Step::SymptomSelection => Step::SymptomSubcategory,
            Step::ClarifyingQuestions(ClarifyingStage::Second) => {
                Step::ClarifyingQuestions(ClarifyingStage::First)
            }
            Step::ClarifyingQuestions(ClarifyingStage::First) => Step::SymptomSelection,
            Step::RiskFlagSelection => {
                if self.reached_second_stage {
                    Step::ClarifyingQuestions(ClarifyingStage::Second)
                } else {
                    Step::ClarifyingQuestions(ClarifyingStage::First)
                }
            }
            Step::Results => {
                self.resolved = None;
                Step::RiskFlagSelection
            }
            Step::Fallback => self
                .fallback_origin
                .take()
                .unwrap_or(Step::ClarifyingQuestions(ClarifyingStage::First)),
        };
        self.move_to(target)
    }

    /// Discards every answer and returns to `welcome`.
    pub fn start_over(&mut self) -> Step {
        self.answers = SessionAnswers::new();
        self.reached_second_stage = false;
        self.fallback_origin = None;
        self.provisional = None;
        self.resolved = None;
        self.move_to(Step::Welcome)
    }
}
