//! # Triage Core
//!
//! Core logic for the symptom triage questionnaire.
//!
//! This crate contains the knowledge base, matching and resolution:
//! - Knowledge base loading from CSV (local file, then remote fallback)
//! - Symptom matching against free text
//! - Condition resolution and escalation
//! - The questionnaire state machine, report export and failure log
//!
//! **No API concerns**: HTTP servers and request handling belong in `api-rest` or `api-shared`.

pub mod config;
pub mod constants;
pub mod error;
pub mod failure_log;
pub mod gender;
pub mod knowledge_base;
pub mod matcher;
pub mod navigator;
pub mod normalize;
pub mod report;
pub mod resolver;
pub mod session;
pub mod similarity;
pub mod validation;

pub use config::CoreConfig;
pub use error::{TriageError, TriageResult};
pub use failure_log::{FailureEntry, FailureLog, FailureReason};
pub use gender::{check_gender_allowed, is_gender_allowed};
pub use knowledge_base::{ConditionRecord, KnowledgeBase};
pub use matcher::{MatchStrategy, SymptomMatcher};
pub use navigator::{ClarifyingStage, Navigator, RiskSelection, Step, StepView};
pub use report::{Outcome, Rationale, Report};
pub use resolver::ResolvedCondition;
pub use session::{Demographics, SessionAnswers};

use std::sync::Arc;
use triage_types::Gender;

/// Shared, read-only triage state: the loaded knowledge base and its configuration.
///
/// Cheap to clone; every clone shares the same knowledge base.
#[derive(Clone, Debug)]
pub struct TriageService {
    cfg: Arc<CoreConfig>,
    kb: Arc<KnowledgeBase>,
}

impl TriageService {
    pub fn new(cfg: Arc<CoreConfig>, kb: KnowledgeBase) -> Self {
        Self {
            cfg,
            kb: Arc::new(kb),
        }
    }

    /// Loads the knowledge base named by `cfg`.
    ///
    /// # Errors
    ///
    /// - `TriageError::FileRead`, `TriageError::Csv` or `TriageError::DataLoad` from the local
    ///   file when no remote URL is configured
    /// - `TriageError::DataLoad` naming both causes when the local file and the remote copy
    ///   both fail
    pub fn load(cfg: Arc<CoreConfig>) -> TriageResult<Self> {
        let kb = KnowledgeBase::load(&cfg)?;
        tracing::info!("knowledge base loaded with {} conditions", kb.len());
        Ok(Self::new(cfg, kb))
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn matcher(&self) -> SymptomMatcher {
        SymptomMatcher::new(self.cfg.match_threshold())
    }

    pub fn failure_log(&self) -> FailureLog {
        FailureLog::new(self.cfg.failure_log_path())
    }

    /// Starts a fresh session at the welcome step.
    pub fn start_session(&self) -> Navigator {
        Navigator::new(
            Arc::clone(&self.kb),
            self.matcher(),
            self.cfg.match_strategy(),
        )
        .with_failure_log(self.failure_log())
    }

    /// Primary categories offered to the given gender, or all of them.
    pub fn categories(&self, gender: Option<Gender>) -> Vec<&str> {
        match gender {
            Some(g) => self.kb.categories_for_gender(g),
            None => self.kb.primary_categories(),
        }
    }

    /// Free-text search outside any session.
    ///
    /// # Errors
    ///
    /// Returns `TriageError::Validation` for blank input.
    pub fn search(
        &self,
        text: &str,
        strategy: Option<MatchStrategy>,
    ) -> TriageResult<Vec<&ConditionRecord>> {
        let text = validation::validate_free_text(text)?;
        let strategy = strategy.unwrap_or(self.cfg.match_strategy());
        Ok(self.matcher().search(strategy, &text, self.kb.records()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_base::test_support::sample_kb;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> TriageService {
        let cfg = CoreConfig::new(
            dir.path().join("kb.csv"),
            None,
            dir.path().join("failures.csv"),
            0.65,
            MatchStrategy::Anchored,
        )
        .expect("valid config");
        TriageService::new(Arc::new(cfg), sample_kb())
    }

    #[test]
    fn categories_respect_gender() {
        let dir = TempDir::new().expect("temp dir");
        let svc = service(&dir);
        assert_eq!(svc.categories(None).len(), 5);
        assert!(!svc
            .categories(Some(Gender::Female))
            .contains(&"Men's Health"));
    }

    #[test]
    fn search_uses_configured_strategy_unless_overridden() {
        let dir = TempDir::new().expect("temp dir");
        let svc = service(&dir);
        let anchored = svc.search("fever", None).unwrap();
        assert_eq!(anchored.len(), 1);
        let phrase = svc.search("fever", Some(MatchStrategy::Phrase)).unwrap();
        assert_eq!(phrase.len(), 2);
        assert!(matches!(
            svc.search("  ", None),
            Err(TriageError::Validation(_))
        ));
    }

    #[test]
    fn sessions_share_the_knowledge_base_and_log_failures() {
        let dir = TempDir::new().expect("temp dir");
        let svc = service(&dir);
        let mut first = svc.start_session();
        let second = svc.start_session();

        first.begin().unwrap();
        assert_eq!(first.step(), Step::UserInfo);
        assert_eq!(second.step(), Step::Welcome);

        first
            .submit_user_info(30, Some(Gender::Male), "")
            .unwrap();
        first.request_free_input().unwrap();
        assert!(first.submit_free_text("purple zebra").is_err());
        assert_eq!(svc.failure_log().entries().unwrap().len(), 1);
    }

    #[test]
    fn load_reports_missing_sources() {
        let dir = TempDir::new().expect("temp dir");
        let cfg = CoreConfig::new(
            dir.path().join("absent.csv"),
            None,
            dir.path().join("failures.csv"),
            0.65,
            MatchStrategy::Anchored,
        )
        .unwrap();
        let err = TriageService::load(Arc::new(cfg)).expect_err("no knowledge base");
        assert!(matches!(err, TriageError::FileRead(_)));
    }
}
