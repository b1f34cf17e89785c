//! Constants used throughout the triage core crate.
//!
//! Column names, file names and tuning defaults live here so the loader, the matcher and the
//! binaries agree on them.

/// Default path of the knowledge base CSV when no explicit path is configured.
pub const DEFAULT_KB_PATH: &str = "data/symptom_kb.csv";

/// Default path of the append-only failure log.
pub const DEFAULT_FAILURE_LOG_PATH: &str = "triage_failures.csv";

/// Default similarity ratio at or above which two symptom terms are considered a match.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.65;

/// Suffixes removed by the stemmer, tried in this order. Only the first match is removed.
pub const STEM_SUFFIXES: [&str; 6] = ["ing", "ion", "ed", "s", "ness", "able"];

/// Label of the risk-flag option meaning "none of these apply".
pub const NO_RISK_LABEL: &str = "None / Not Applicable";

/// Headline shown when every clarifying answer was "No" and no risks were confirmed.
pub const NO_CLEAR_MATCH: &str = "No Clear Match";

/// Prefix of exported report file names; the local date (`YYYYMMDD`) and `.txt` follow.
pub const REPORT_FILE_PREFIX: &str = "triage_report_";

// Knowledge base columns, after header whitespace has been trimmed.
pub const COL_PRIMARY_CATEGORY: &str = "Primary Category";
pub const COL_SUB_CATEGORY: &str = "SubCategory";
pub const COL_CONDITION: &str = "Condition";
pub const COL_SYMPTOMS: &str = "Symptoms";
pub const COL_CLARIFYING_1: &str = "Clarifying Questions 1";
pub const COL_CLARIFYING_2: &str = "Clarifying Questions2";
pub const COL_RISK_FLAGS: &str = "RiskFlags";
pub const COL_ACUITY: &str = "Acuity Level";
pub const COL_DEFAULT_RECOMMENDATION: &str = "Default Recommendation";
pub const COL_ESCALATED_RECOMMENDATION: &str = "Escalated Recommendation";
pub const COL_REFERRAL: &str = "Referral";

/// Every column the loader requires to be present in the header row.
pub const REQUIRED_COLUMNS: [&str; 11] = [
    COL_PRIMARY_CATEGORY,
    COL_SUB_CATEGORY,
    COL_CONDITION,
    COL_SYMPTOMS,
    COL_CLARIFYING_1,
    COL_CLARIFYING_2,
    COL_RISK_FLAGS,
    COL_ACUITY,
    COL_DEFAULT_RECOMMENDATION,
    COL_ESCALATED_RECOMMENDATION,
    COL_REFERRAL,
];

/// Column headers of the failure log.
pub const FAILURE_LOG_HEADERS: [&str; 3] = ["timestamp", "reason", "detail"];
