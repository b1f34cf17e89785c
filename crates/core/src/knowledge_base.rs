//! Condition knowledge base.
//!
//! The knowledge base is a CSV table, one condition per row, loaded once at startup and read-only
//! afterwards. Callers share it behind an `Arc`; nothing in the crate mutates it after load.
//!
//! ## Source format
//!
//! Required columns (header whitespace is trimmed on load):
//!
//! ```text
//! Primary Category, SubCategory, Condition, Symptoms, Clarifying Questions 1,
//! Clarifying Questions2, RiskFlags, Acuity Level, Default Recommendation,
//! Escalated Recommendation, Referral
//! ```
//!
//! `Symptoms` and `RiskFlags` are comma-separated lists inside a single cell. Blank cells are
//! treated as absent. `Condition` and `Acuity Level` must be present on every row.

use crate::constants::REQUIRED_COLUMNS;
use crate::error::{TriageError, TriageResult};
use crate::gender::is_gender_allowed;
use crate::CoreConfig;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use triage_types::{AcuityLevel, Gender, NonEmptyText};

/// One knowledge base row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConditionRecord {
    pub primary_category: String,
    pub sub_category: String,
    pub condition: NonEmptyText,
    pub symptoms: Vec<String>,
    pub clarifying_question_1: Option<String>,
    pub clarifying_question_2: Option<String>,
    pub risk_flags: Vec<String>,
    pub acuity_level: AcuityLevel,
    pub default_recommendation: String,
    pub escalated_recommendation: String,
    pub referral: Option<String>,
}

impl ConditionRecord {
    /// Whether this row sits under the given primary and sub category.
    pub fn is_in(&self, primary_category: &str, sub_category: &str) -> bool {
        self.primary_category == primary_category && self.sub_category == sub_category
    }

    /// Recommendation text for the given escalation verdict.
    pub fn recommendation(&self, is_high_risk: bool) -> &str {
        if is_high_risk {
            &self.escalated_recommendation
        } else {
            &self.default_recommendation
        }
    }
}

#[derive(Deserialize)]
struct RawRow {
    #[serde(rename = "Primary Category")]
    primary_category: Option<String>,
    #[serde(rename = "SubCategory")]
    sub_category: Option<String>,
    #[serde(rename = "Condition")]
    condition: Option<String>,
    #[serde(rename = "Symptoms")]
    symptoms: Option<String>,
    #[serde(rename = "Clarifying Questions 1")]
    clarifying_question_1: Option<String>,
    #[serde(rename = "Clarifying Questions2")]
    clarifying_question_2: Option<String>,
    #[serde(rename = "RiskFlags")]
    risk_flags: Option<String>,
    #[serde(rename = "Acuity Level")]
    acuity_level: Option<String>,
    #[serde(rename = "Default Recommendation")]
    default_recommendation: Option<String>,
    #[serde(rename = "Escalated Recommendation")]
    escalated_recommendation: Option<String>,
    #[serde(rename = "Referral")]
    referral: Option<String>,
}

fn present(cell: Option<String>) -> Option<String> {
    cell.map(|c| c.trim().to_string()).filter(|c| !c.is_empty())
}

/// Splits a comma-separated cell into trimmed, non-empty items, dropping case-insensitive
/// duplicates while keeping first-seen order.
fn split_list(cell: Option<String>) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in cell.unwrap_or_default().split(',') {
        let item = item.trim();
        if item.is_empty() || items.iter().any(|seen| seen.eq_ignore_ascii_case(item)) {
            continue;
        }
        items.push(item.to_string());
    }
    items
}

impl RawRow {
    fn into_record(self, row: usize) -> TriageResult<ConditionRecord> {
        let condition = present(self.condition)
            .and_then(|c| NonEmptyText::new(c).ok())
            .ok_or_else(|| TriageError::DataLoad(format!("row {row}: Condition is required")))?;

        let acuity_raw = present(self.acuity_level).ok_or_else(|| {
            TriageError::DataLoad(format!("row {row}: Acuity Level is required"))
        })?;
        let acuity_level = acuity_raw
            .parse::<AcuityLevel>()
            .map_err(|e| TriageError::DataLoad(format!("row {row}: {e}")))?;

        Ok(ConditionRecord {
            primary_category: present(self.primary_category).unwrap_or_default(),
            sub_category: present(self.sub_category).unwrap_or_default(),
            condition,
            symptoms: split_list(self.symptoms),
            clarifying_question_1: present(self.clarifying_question_1),
            clarifying_question_2: present(self.clarifying_question_2),
            risk_flags: split_list(self.risk_flags),
            acuity_level,
            default_recommendation: present(self.default_recommendation).unwrap_or_default(),
            escalated_recommendation: present(self.escalated_recommendation).unwrap_or_default(),
            referral: present(self.referral),
        })
    }
}

/// Ordered, immutable sequence of condition records.
#[derive(Clone, Debug, Default)]
pub struct KnowledgeBase {
    records: Vec<ConditionRecord>,
}

impl KnowledgeBase {
    /// Builds a knowledge base from records already in memory.
    pub fn from_records(records: Vec<ConditionRecord>) -> Self {
        Self { records }
    }

    /// Loads the knowledge base described by `cfg`.
    ///
    /// The local path is tried first. If it cannot be read or parsed and a remote URL is
    /// configured, the remote copy is fetched instead.
    ///
    /// # Errors
    ///
    /// Returns `TriageError::DataLoad` naming both causes when every source fails, or the
    /// local error unchanged when no remote URL is configured.
    pub fn load(cfg: &CoreConfig) -> TriageResult<Self> {
        let local = Self::from_path(cfg.kb_path());
        let local_err = match local {
            Ok(kb) => return Ok(kb),
            Err(e) => e,
        };

        let Some(url) = cfg.kb_url() else {
            return Err(local_err);
        };

        tracing::warn!(
            "knowledge base unavailable at {} ({}); trying {}",
            cfg.kb_path().display(),
            local_err,
            url
        );
        Self::from_url(url).map_err(|remote_err| {
            TriageError::DataLoad(format!("local: {local_err}; remote: {remote_err}"))
        })
    }

    /// Loads the knowledge base from a local CSV file.
    pub fn from_path(path: &Path) -> TriageResult<Self> {
        let file = std::fs::File::open(path).map_err(TriageError::FileRead)?;
        let kb = Self::from_reader(file)?;
        tracing::info!(
            "loaded {} conditions from {}",
            kb.records.len(),
            path.display()
        );
        Ok(kb)
    }

    /// Fetches and parses a remote CSV copy of the knowledge base.
    ///
    /// This performs a blocking request and must not be called from an async context.
    pub fn from_url(url: &str) -> TriageResult<Self> {
        let body = reqwest::blocking::get(url)?.error_for_status()?.bytes()?;
        let kb = Self::from_reader(body.as_ref())?;
        tracing::info!("loaded {} conditions from {}", kb.records.len(), url);
        Ok(kb)
    }

    /// Parses CSV from any reader.
    ///
    /// # Errors
    ///
    /// - `TriageError::DataLoad` if a required column is missing or a row is invalid
    /// - `TriageError::Csv` if the CSV itself is malformed
    pub fn from_reader<R: Read>(reader: R) -> TriageResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|col| !headers.iter().any(|h| h == *col))
            .collect();
        if !missing.is_empty() {
            return Err(TriageError::DataLoad(format!(
                "missing required columns: {}",
                missing.join(", ")
            )));
        }

        let mut records = Vec::new();
        for (index, result) in csv_reader.records().enumerate() {
            let row = index + 1;
            let record = result?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                tracing::warn!("skipping blank knowledge base row {}", row);
                continue;
            }
            let raw: RawRow = record.deserialize(Some(&headers))?;
            records.push(raw.into_record(row)?);
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[ConditionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct primary categories in first-seen order.
    pub fn primary_categories(&self) -> Vec<&str> {
        primary_categories(&self.records)
    }

    /// Primary categories offered to a user of the given gender.
    pub fn categories_for_gender(&self, gender: Gender) -> Vec<&str> {
        self.primary_categories()
            .into_iter()
            .filter(|category| is_gender_allowed(category, gender))
            .collect()
    }

    /// Distinct sub categories of `primary_category` in first-seen order.
    pub fn subcategories(&self, primary_category: &str) -> Vec<&str> {
        subcategories(&self.records, primary_category)
    }

    /// Rows under exactly `primary_category` / `sub_category`, in source order.
    pub fn filter(&self, primary_category: &str, sub_category: &str) -> Vec<&ConditionRecord> {
        filter_records(&self.records, primary_category, sub_category)
    }
}

/// Distinct primary categories of `rows` in first-seen order. Blank categories are skipped.
pub fn primary_categories<'a, I>(rows: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a ConditionRecord>,
{
    distinct(
        rows.into_iter()
            .map(|r| r.primary_category.as_str())
            .filter(|c| !c.is_empty()),
    )
}

/// Distinct sub categories of `primary_category` within `rows`, first-seen order.
pub fn subcategories<'a, I>(rows: I, primary_category: &str) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a ConditionRecord>,
{
    distinct(
        rows.into_iter()
            .filter(|r| r.primary_category == primary_category)
            .map(|r| r.sub_category.as_str())
            .filter(|c| !c.is_empty()),
    )
}

/// Rows of `rows` under exactly `primary_category` / `sub_category`, in source order.
pub fn filter_records<'a, I>(
    rows: I,
    primary_category: &str,
    sub_category: &str,
) -> Vec<&'a ConditionRecord>
where
    I: IntoIterator<Item = &'a ConditionRecord>,
{
    rows.into_iter()
        .filter(|r| r.is_in(primary_category, sub_category))
        .collect()
}

fn distinct<'a>(items: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub const SAMPLE_KB: &str = "\
 Primary Category , SubCategory ,Condition,Symptoms,Clarifying Questions 1,Clarifying Questions2,RiskFlags,Acuity Level,Default Recommendation,Escalated Recommendation,Referral
Headache,Throbbing,Migraine,\"headache, nausea, light sensitivity\",Is the pain on one side?,Do you see flashing lights?,\"Pregnancy, Over 50\",2,Rest in a dark room.,See a GP today.,Neurology clinic
Headache,Throbbing,Tension Headache,\"headache, neck stiffness\",Is the pain on one side?,Is it worse under stress?,,1,Take simple analgesia.,See a GP.,
Headache,Throbbing,Cluster Headache,\"severe headache, eye watering\",Is the pain on one side?,Does it wake you at night?,Smoker,3,See a GP soon.,Go to urgent care.,
Fever,General,Viral Fever,\"fever, chills, body aches\",Have you had it for more than 3 days?,,\"Diabetes, Asthma\",1,Rest and fluids.,Seek urgent review.,
Women's Health,Pelvic,Pelvic Inflammatory Disease,\"pelvic pain, fever\",Is there unusual discharge?,,,2,Book a GP visit.,Go to sexual health clinic today.,
Men's Health,Urinary,Prostatitis,\"painful urination, pelvic pain\",Do you have a fever?,,,2,Book a GP visit.,Seek same-day care.,Urology
Respiratory,Breathing,Asthma Attack,\"wheezing, shortness of breath, coughing\",Is your inhaler helping?,Can you speak in full sentences?,Previous ICU admission,3,Use your reliever inhaler.,Call emergency services.,
";

    pub fn sample_kb() -> KnowledgeBase {
        KnowledgeBase::from_reader(SAMPLE_KB.as_bytes()).expect("sample knowledge base parses")
    }

    pub fn record(primary: &str, sub: &str, condition: &str, acuity: u8) -> ConditionRecord {
        ConditionRecord {
            primary_category: primary.into(),
            sub_category: sub.into(),
            condition: NonEmptyText::new(condition).unwrap(),
            symptoms: vec![],
            clarifying_question_1: None,
            clarifying_question_2: None,
            risk_flags: vec![],
            acuity_level: AcuityLevel::new(acuity).unwrap(),
            default_recommendation: format!("{condition}: default"),
            escalated_recommendation: format!("{condition}: escalated"),
            referral: None,
        }
    }
}
