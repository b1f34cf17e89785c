//! Per-session answer state.
//!
//! A `SessionAnswers` is created when a session starts, filled in step by step by the
//! navigator and discarded on restart. It is never shared between sessions.

use crate::knowledge_base::{ConditionRecord, KnowledgeBase};
use serde::Serialize;
use std::collections::BTreeMap;
use triage_types::{Answer, Gender};

/// Intake answers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Demographics {
    pub age: u8,
    pub gender: Gender,
    pub existing_conditions: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SessionAnswers {
    pub demographics: Option<Demographics>,
    pub primary_category: Option<String>,
    pub sub_category: Option<String>,
    pub free_text_symptoms: Option<String>,
    pub selected_symptoms: Vec<String>,
    /// Clarifying question text to answer.
    pub clarifying_answers: BTreeMap<String, Answer>,
    pub confirmed_risks: Vec<String>,
    /// Rows narrowed by free text. Empty means the whole knowledge base.
    #[serde(skip)]
    pub matched_subset: Vec<ConditionRecord>,
    pub free_input_mode: bool,
}

impl SessionAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gender(&self) -> Option<Gender> {
        self.demographics.as_ref().map(|d| d.gender)
    }

    /// The rows the current session is choosing between.
    pub fn candidate_rows<'a>(&'a self, kb: &'a KnowledgeBase) -> &'a [ConditionRecord] {
        if self.matched_subset.is_empty() {
            kb.records()
        } else {
            &self.matched_subset
        }
    }

    pub fn answer_for(&self, question: &str) -> Option<Answer> {
        self.clarifying_answers.get(question).copied()
    }

    /// Whether any clarifying question was answered "Yes".
    pub fn any_yes(&self) -> bool {
        self.clarifying_answers.values().any(|a| a.is_yes())
    }

    /// Drops answers collected at or after the clarifying stage.
    pub(crate) fn clear_clarifying(&mut self) {
        self.clarifying_answers.clear();
        self.confirmed_risks.clear();
    }
}
