//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Binaries read environment variables and CLI flags; the core never
//! touches the process environment while a session is being handled.

use crate::constants::{DEFAULT_FAILURE_LOG_PATH, DEFAULT_KB_PATH, DEFAULT_MATCH_THRESHOLD};
use crate::matcher::MatchStrategy;
use crate::{TriageError, TriageResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    kb_path: PathBuf,
    kb_url: Option<String>,
    failure_log_path: PathBuf,
    match_threshold: f64,
    match_strategy: MatchStrategy,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `TriageError::InvalidInput` if the threshold is outside `(0, 1]` or the remote
    /// URL is not an `http(s)` URL.
    pub fn new(
        kb_path: PathBuf,
        kb_url: Option<String>,
        failure_log_path: PathBuf,
        match_threshold: f64,
        match_strategy: MatchStrategy,
    ) -> TriageResult<Self> {
        validate_match_threshold(match_threshold)?;

        let kb_url = kb_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        if let Some(url) = &kb_url {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(TriageError::InvalidInput(format!(
                    "knowledge base URL must be http(s): {url}"
                )));
            }
        }

        Ok(Self {
            kb_path,
            kb_url,
            failure_log_path,
            match_threshold,
            match_strategy,
        })
    }

    pub fn kb_path(&self) -> &Path {
        &self.kb_path
    }

    pub fn kb_url(&self) -> Option<&str> {
        self.kb_url.as_deref()
    }

    pub fn failure_log_path(&self) -> &Path {
        &self.failure_log_path
    }

    pub fn match_threshold(&self) -> f64 {
        self.match_threshold
    }

    pub fn match_strategy(&self) -> MatchStrategy {
        self.match_strategy
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            kb_path: PathBuf::from(DEFAULT_KB_PATH),
            kb_url: None,
            failure_log_path: PathBuf::from(DEFAULT_FAILURE_LOG_PATH),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            match_strategy: MatchStrategy::default(),
        }
    }
}

fn validate_match_threshold(threshold: f64) -> TriageResult<()> {
    if !threshold.is_finite() || threshold <= 0.0 || threshold > 1.0 {
        return Err(TriageError::InvalidInput(format!(
            "match threshold must be in (0, 1], got {threshold}"
        )));
    }
    Ok(())
}

/// Parse the match threshold from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_MATCH_THRESHOLD`].
pub fn match_threshold_from_env_value(value: Option<String>) -> TriageResult<f64> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let Some(raw) = value else {
        return Ok(DEFAULT_MATCH_THRESHOLD);
    };

    let parsed: f64 = raw.parse().map_err(|_| {
        TriageError::InvalidInput(format!("match threshold is not a number: {raw}"))
    })?;
    validate_match_threshold(parsed)?;
    Ok(parsed)
}

/// Parse the free-text match strategy from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default strategy.
pub fn match_strategy_from_env_value(value: Option<String>) -> TriageResult<MatchStrategy> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let parsed = value.map(|v| v.parse::<MatchStrategy>()).transpose()?;

    Ok(parsed.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_defaults_when_unset_or_blank() {
        assert_eq!(
            match_threshold_from_env_value(None).unwrap(),
            DEFAULT_MATCH_THRESHOLD
        );
        assert_eq!(
            match_threshold_from_env_value(Some("   ".into())).unwrap(),
            DEFAULT_MATCH_THRESHOLD
        );
    }

    #[test]
    fn threshold_parses_and_validates_range() {
        assert_eq!(match_threshold_from_env_value(Some("0.8".into())).unwrap(), 0.8);
        assert!(match_threshold_from_env_value(Some("1.5".into())).is_err());
        assert!(match_threshold_from_env_value(Some("0".into())).is_err());
        assert!(match_threshold_from_env_value(Some("abc".into())).is_err());
    }

    #[test]
    fn strategy_defaults_to_anchored() {
        assert_eq!(
            match_strategy_from_env_value(None).unwrap(),
            MatchStrategy::Anchored
        );
        assert_eq!(
            match_strategy_from_env_value(Some("phrase".into())).unwrap(),
            MatchStrategy::Phrase
        );
        assert!(match_strategy_from_env_value(Some("neural".into())).is_err());
    }

    #[test]
    fn config_rejects_non_http_url() {
        let err = CoreConfig::new(
            PathBuf::from("kb.csv"),
            Some("ftp://example.org/kb.csv".into()),
            PathBuf::from("log.csv"),
            DEFAULT_MATCH_THRESHOLD,
            MatchStrategy::Anchored,
        )
        .expect_err("ftp should be rejected");
        assert!(matches!(err, TriageError::InvalidInput(_)));
    }

    #[test]
    fn config_drops_blank_url() {
        let cfg = CoreConfig::new(
            PathBuf::from("kb.csv"),
            Some("  ".into()),
            PathBuf::from("log.csv"),
            0.7,
            MatchStrategy::Phrase,
        )
        .unwrap();
        assert!(cfg.kb_url().is_none());
        assert_eq!(cfg.match_threshold(), 0.7);
    }
}
