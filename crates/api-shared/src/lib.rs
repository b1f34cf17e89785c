//! # API Shared
//!
//! Shared utilities and definitions for the triage APIs.
//!
//! Contains:
//! - Request and response types (`dto` module), documented for OpenAPI
//! - Shared services like `HealthService`
//! - The access key gate in front of the questionnaire
//!
//! Used by `api-rest` and the workspace's `triage-run` binary.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{AccessGate, AuthError, ACCESS_KEY_HEADER};
pub use dto::*;
pub use health::HealthService;
