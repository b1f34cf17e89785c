//! Wire types for the triage APIs.
//!
//! These mirror the core types but stay plain: categories, answers and genders travel as
//! strings and are parsed at the API edge.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
    /// Conditions in the loaded knowledge base.
    pub conditions: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    /// Machine-readable error kind, e.g. `validation` or `no_match`.
    pub kind: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategoriesRes {
    pub categories: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SearchReq {
    /// Comma-separated symptoms, e.g. `headache, fever`.
    pub symptoms: String,
    /// `anchored` or `phrase`; the server default when absent.
    #[serde(default)]
    pub strategy: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConditionSummary {
    pub primary_category: String,
    pub sub_category: String,
    pub condition: String,
    pub acuity_level: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SearchRes {
    pub matches: Vec<ConditionSummary>,
}

/// Commands that drive a session forward, back or to the start.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SessionCommand {
    Begin,
    UserInfo {
        age: u8,
        #[serde(default)]
        gender: Option<String>,
        #[serde(default)]
        existing_conditions: String,
    },
    SelectCategory {
        category: String,
    },
    RequestFreeInput,
    SearchSymptoms {
        symptoms: String,
    },
    SelectSubcategory {
        sub_category: String,
    },
    SelectSymptoms {
        symptoms: Vec<String>,
    },
    /// Answers for the current clarifying stage, keyed by question text.
    AnswerQuestions {
        answers: BTreeMap<String, String>,
    },
    SelectRisks {
        #[serde(default)]
        flags: Vec<String>,
        #[serde(default)]
        none: bool,
    },
    Escalate,
    Retry,
    Back,
    StartOver,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OutcomeRes {
    pub headline: String,
    /// `severity_indicators`, `risk_factors`, `general_advice` or `no_clear_match`.
    pub rationale: String,
    pub rationale_text: String,
    pub recommendation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral: Option<String>,
    pub is_high_risk: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SessionRes {
    pub id: String,
    pub step: String,
    /// `first` or `second` while at the clarifying questions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<OutcomeRes>,
    /// Non-blocking notice about the last command.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_tagged() {
        let cmd: SessionCommand =
            serde_json::from_str(r#"{"command":"select_category","category":"Headache"}"#)
                .unwrap();
        assert_eq!(
            cmd,
            SessionCommand::SelectCategory {
                category: "Headache".into()
            }
        );

        let cmd: SessionCommand = serde_json::from_str(r#"{"command":"back"}"#).unwrap();
        assert_eq!(cmd, SessionCommand::Back);
    }

    #[test]
    fn risk_command_defaults() {
        let cmd: SessionCommand =
            serde_json::from_str(r#"{"command":"select_risks","none":true}"#).unwrap();
        assert_eq!(
            cmd,
            SessionCommand::SelectRisks {
                flags: vec![],
                none: true
            }
        );
    }

    #[test]
    fn user_info_gender_is_optional() {
        let cmd: SessionCommand =
            serde_json::from_str(r#"{"command":"user_info","age":40}"#).unwrap();
        assert_eq!(
            cmd,
            SessionCommand::UserInfo {
                age: 40,
                gender: None,
                existing_conditions: String::new()
            }
        );
    }
}
