//! Gender eligibility of primary categories.
//!
//! A small hand-maintained allowlist marks categories that only apply to one gender. The
//! predicate is total and pure: every category/gender pair yields an answer, nothing is logged.

use crate::{TriageError, TriageResult};
use triage_types::Gender;

const WOMEN_SPECIFIC: [&str; 14] = [
    "Women's Health",
    "Pelvic Inflammatory Disease",
    "Breast Lump",
    "Cervical Cancer",
    "Menopause",
    "Fibroids",
    "Heavy Menstrual Bleeding",
    "Yeast Infection",
    "Bacterial Vaginosis",
    "Endometriosis",
    "PCOS",
    "Pelvic Organ Prolapse",
    "Ovarian Cyst",
    "Ectopic Pregnancy",
];

const MEN_SPECIFIC: [&str; 6] = [
    "Men's Health",
    "Prostatitis",
    "Testicular Torsion",
    "Benign Prostatic Hyperplasia",
    "Varicocele",
    "Balanitis",
];

/// Category labels exported from spreadsheets often carry a typographic apostrophe.
fn canonical(category: &str) -> String {
    category.trim().replace('\u{2019}', "'")
}

/// Whether `primary_category` may be offered to a user of `gender`.
pub fn is_gender_allowed(primary_category: &str, gender: Gender) -> bool {
    let category = canonical(primary_category);
    match gender {
        Gender::Male => !WOMEN_SPECIFIC.contains(&category.as_str()),
        Gender::Female => !MEN_SPECIFIC.contains(&category.as_str()),
    }
}

/// [`is_gender_allowed`] as a `Result` carrying the rejection reason.
///
/// # Errors
///
/// Returns `TriageError::GenderRestriction` when the category is reserved for the other gender.
pub fn check_gender_allowed(primary_category: &str, gender: Gender) -> TriageResult<()> {
    if is_gender_allowed(primary_category, gender) {
        Ok(())
    } else {
        Err(TriageError::GenderRestriction {
            category: primary_category.to_string(),
            gender,
        })
    }
}
