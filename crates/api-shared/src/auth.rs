//! Entry gate.
//!
//! The questionnaire sits behind a single shared access key sent in the `x-access-key` header.
//! When no key is configured the gate is open.

use std::env;

/// Header carrying the access key.
pub const ACCESS_KEY_HEADER: &str = "x-access-key";

/// Environment variable holding the expected key.
pub const ACCESS_KEY_ENV: &str = "TRIAGE_ACCESS_KEY";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("access key required")]
    Missing,
    #[error("invalid access key")]
    Invalid,
}

#[derive(Clone, Debug, Default)]
pub struct AccessGate {
    expected: Option<String>,
}

impl AccessGate {
    /// Builds a gate for `expected`. A blank key leaves the gate open.
    pub fn new(expected: Option<String>) -> Self {
        Self {
            expected: expected.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Reads the expected key from `TRIAGE_ACCESS_KEY`.
    pub fn from_env() -> Self {
        Self::new(env::var(ACCESS_KEY_ENV).ok())
    }

    pub fn is_open(&self) -> bool {
        self.expected.is_none()
    }

    /// Validates the provided key against the expected key.
    pub fn validate_access_key(&self, provided: Option<&str>) -> Result<(), AuthError> {
        let Some(expected) = &self.expected else {
            return Ok(());
        };
        match provided {
            None => Err(AuthError::Missing),
            Some(key) if key == expected => Ok(()),
            Some(_) => Err(AuthError::Invalid),
        }
    }
}
