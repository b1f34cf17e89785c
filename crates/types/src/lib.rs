//! Shared vocabulary types for the symptom triage workspace.
//!
//! These types carry validation at construction so that the core engine, the CLI and the
//! REST layer agree on what a gender, an answer or an acuity tier can be.

use std::fmt;
use std::str::FromStr;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// Errors raised when parsing one of the enumerated vocabulary types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown gender '{0}' (expected Male or Female)")]
    Gender(String),
    #[error("unknown answer '{0}' (expected Yes or No)")]
    Answer(String),
    #[error("acuity level must be 1, 2 or 3 (got '{0}')")]
    Acuity(String),
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Returns
    ///
    /// Returns `Ok(NonEmptyText)` if the trimmed input is non-empty,
    /// or `Err(TextError::Empty)` if it's empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Enumerated vocabulary
// ============================================================================

/// Gender as collected at intake. Only used for category eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            _ => Err(ParseError::Gender(s.to_owned())),
        }
    }
}

/// Yes/No answer to a clarifying question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Answer {
    Yes,
    No,
}

impl Answer {
    pub fn is_yes(self) -> bool {
        matches!(self, Answer::Yes)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Answer::Yes => "Yes",
            Answer::No => "No",
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Answer {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" => Ok(Answer::Yes),
            "no" | "n" => Ok(Answer::No),
            _ => Err(ParseError::Answer(s.to_owned())),
        }
    }
}

/// Severity tier of a condition: 1 is low, 3 is high/urgent.
///
/// Ordered, so the highest-acuity candidate can be found with `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AcuityLevel(u8);

impl AcuityLevel {
    pub const LOW: AcuityLevel = AcuityLevel(1);
    pub const MODERATE: AcuityLevel = AcuityLevel(2);
    pub const HIGH: AcuityLevel = AcuityLevel(3);

    pub fn new(level: u8) -> Result<Self, ParseError> {
        match level {
            1..=3 => Ok(Self(level)),
            other => Err(ParseError::Acuity(other.to_string())),
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_high(self) -> bool {
        self == Self::HIGH
    }
}

impl fmt::Display for AcuityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AcuityLevel {
    type Err = ParseError;

    /// Accepts integer text and spreadsheet exports such as `"3.0"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let whole = match trimmed.parse::<u8>() {
            Ok(v) => v,
            Err(_) => {
                let f: f64 = trimmed
                    .parse()
                    .map_err(|_| ParseError::Acuity(s.to_owned()))?;
                if f.fract() != 0.0 || !(0.0..=255.0).contains(&f) {
                    return Err(ParseError::Acuity(s.to_owned()));
                }
                f as u8
            }
        };
        AcuityLevel::new(whole).map_err(|_| ParseError::Acuity(s.to_owned()))
    }
}

impl serde::Serialize for AcuityLevel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for AcuityLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let level = u8::deserialize(deserializer)?;
        AcuityLevel::new(level).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_and_rejects_blank() {
        assert_eq!(NonEmptyText::new("  Migraine ").unwrap().as_str(), "Migraine");
        assert!(matches!(NonEmptyText::new("   "), Err(TextError::Empty)));
    }

    #[test]
    fn gender_parses_case_insensitively() {
        assert_eq!("male".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!(" Female ".parse::<Gender>().unwrap(), Gender::Female);
        assert!("other".parse::<Gender>().is_err());
    }

    #[test]
    fn answer_parses_short_forms() {
        assert_eq!("y".parse::<Answer>().unwrap(), Answer::Yes);
        assert_eq!("No".parse::<Answer>().unwrap(), Answer::No);
        assert!("maybe".parse::<Answer>().is_err());
    }

    #[test]
    fn acuity_accepts_spreadsheet_floats() {
        assert_eq!("3.0".parse::<AcuityLevel>().unwrap(), AcuityLevel::HIGH);
        assert_eq!("2".parse::<AcuityLevel>().unwrap(), AcuityLevel::MODERATE);
        assert!("2.5".parse::<AcuityLevel>().is_err());
        assert!("4".parse::<AcuityLevel>().is_err());
        assert!("0".parse::<AcuityLevel>().is_err());
    }

    #[test]
    fn acuity_orders_by_severity() {
        assert!(AcuityLevel::HIGH > AcuityLevel::LOW);
        assert!(AcuityLevel::HIGH.is_high());
        assert!(!AcuityLevel::MODERATE.is_high());
    }

    #[test]
    fn acuity_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<AcuityLevel>("5").is_err());
        assert_eq!(serde_json::from_str::<AcuityLevel>("1").unwrap(), AcuityLevel::LOW);
    }
}
