//! Append-only failure log.
//!
//! Every session that ends without a usable match (no symptom match, escalation to a doctor,
//! an unresolvable category) leaves one CSV row here for later review. Rows are serialised in
//! memory and written with a single `write_all` on a file opened in append mode, so concurrent
//! writers interleave whole lines.

use crate::constants::FAILURE_LOG_HEADERS;
use crate::{TriageError, TriageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Why a session was logged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// Free-text search returned no candidate rows.
    NoSymptomMatch,
    /// The user asked to speak with a doctor.
    EscalatedToDoctor,
    /// The resolver found no row for the chosen categories.
    UnresolvedCondition,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::NoSymptomMatch => "no_symptom_match",
            FailureReason::EscalatedToDoctor => "escalated_to_doctor",
            FailureReason::UnresolvedCondition => "unresolved_condition",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failure log row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub timestamp: DateTime<Utc>,
    pub reason: String,
    #[serde(default)]
    pub detail: String,
}

#[derive(Clone, Debug)]
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a row stamped with the current time.
    pub fn record(&self, reason: FailureReason, detail: &str) -> TriageResult<()> {
        self.append(&FailureEntry {
            timestamp: Utc::now(),
            reason: reason.as_str().to_string(),
            detail: detail.to_string(),
        })
    }

    /// Like [`FailureLog::record`], but a write failure is logged instead of returned.
    ///
    /// Used on navigation paths, where a broken log must not stop the user's session.
    pub fn record_or_log(&self, reason: FailureReason, detail: &str) {
        if let Err(e) = self.record(reason, detail) {
            tracing::error!(
                "could not append to failure log {}: {}",
                self.path.display(),
                e
            );
        }
    }

    fn append(&self, entry: &FailureEntry) -> TriageResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(TriageError::FailureLogWrite)?;
        let is_new = file
            .metadata()
            .map_err(TriageError::FailureLogWrite)?
            .len()
            == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        if is_new {
            writer.write_record(FAILURE_LOG_HEADERS)?;
        }
        writer.serialize(entry)?;
        let buf = writer
            .into_inner()
            .map_err(|e| TriageError::FailureLogWrite(e.into_error()))?;

        file.write_all(&buf).map_err(TriageError::FailureLogWrite)?;
        Ok(())
    }

    /// Reads back every row. A log that does not exist yet has no entries.
    pub fn entries(&self) -> TriageResult<Vec<FailureEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = std::fs::File::open(&self.path).map_err(TriageError::FailureLogRead)?;
        let mut reader = csv::Reader::from_reader(file);
        let mut entries = Vec::new();
        for row in reader.deserialize() {
            entries.push(row?);
        }
        Ok(entries)
    }
}
