use triage_types::Gender;

#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    /// A required prior answer is missing or malformed. Blocks forward navigation only.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Free-text search or a category filter produced zero candidate rows.
    #[error("no matching condition: {0}")]
    NoMatch(String),
    /// The selected category is not offered for the stated gender.
    #[error("'{category}' is not available for the selected gender ({gender})")]
    GenderRestriction { category: String, gender: Gender },
    /// Bad configuration value or a transition the current step does not accept.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to load knowledge base: {0}")]
    DataLoad(String),
    #[error("failed to read knowledge base file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to parse knowledge base CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to fetch remote knowledge base: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to write failure log: {0}")]
    FailureLogWrite(std::io::Error),
    #[error("failed to read failure log: {0}")]
    FailureLogRead(std::io::Error),
    #[error("failed to write report: {0}")]
    ReportWrite(std::io::Error),
}

impl TriageError {
    /// Recoverable errors are shown inline and leave the session usable.
    /// Everything else is fatal for the session and must be surfaced.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TriageError::Validation(_)
                | TriageError::NoMatch(_)
                | TriageError::GenderRestriction { .. }
                | TriageError::InvalidInput(_)
        )
    }
}

pub type TriageResult<T> = std::result::Result<T, TriageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_facing_errors_are_recoverable() {
        assert!(TriageError::Validation("gender".into()).is_recoverable());
        assert!(TriageError::NoMatch("none".into()).is_recoverable());
        assert!(TriageError::GenderRestriction {
            category: "Prostatitis".into(),
            gender: Gender::Female,
        }
        .is_recoverable());
    }

    #[test]
    fn data_load_errors_are_fatal() {
        assert!(!TriageError::DataLoad("missing column".into()).is_recoverable());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(!TriageError::FileRead(io).is_recoverable());
    }

    #[test]
    fn gender_restriction_message_names_category() {
        let err = TriageError::GenderRestriction {
            category: "Menopause".into(),
            gender: Gender::Male,
        };
        assert_eq!(
            err.to_string(),
            "'Menopause' is not available for the selected gender (Male)"
        );
    }
}
