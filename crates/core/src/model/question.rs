use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::model::category::Category;

//
// ─── QUESTION ID ──────────────────────────────────────────────────────────────
//

/// Unique identifier for a Question.
///
/// Question ids come from the question repository and are opaque strings
/// (typically UUIDs).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionId(String);

impl QuestionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({})", self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── OPTION CORRECTNESS FLAG ──────────────────────────────────────────────────
//

/// Raw persisted shape of an option's correctness flag.
///
/// Historical data stores the flag as boolean `true` or the string `"true"`,
/// under either of two field names. `QuestionOption::is_correct` is the one
/// place that normalizes this into a plain `bool`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectFlag {
    Bool(bool),
    Text(String),
}

impl CorrectFlag {
    #[must_use]
    pub fn is_set(&self) -> bool {
        match self {
            CorrectFlag::Bool(b) => *b,
            CorrectFlag::Text(s) => s == "true",
        }
    }
}

//
// ─── QUESTION OPTION ──────────────────────────────────────────────────────────
//

/// One selectable answer option.
///
/// `id` may be absent in older data, in which case the option is only
/// addressable by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(
        default,
        rename = "isCorrect",
        skip_serializing_if = "Option::is_none"
    )]
    correct_camel: Option<CorrectFlag>,
    #[serde(
        default,
        rename = "is_correct",
        skip_serializing_if = "Option::is_none"
    )]
    correct_snake: Option<CorrectFlag>,
}

impl QuestionOption {
    /// Builds a correct option.
    #[must_use]
    pub fn correct(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            text: text.into(),
            correct_camel: Some(CorrectFlag::Bool(true)),
            correct_snake: None,
        }
    }

    /// Builds an incorrect option.
    #[must_use]
    pub fn incorrect(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            text: text.into(),
            correct_camel: Some(CorrectFlag::Bool(false)),
            correct_snake: None,
        }
    }

    /// Builds an option carrying the flag under the legacy snake_case field.
    #[must_use]
    pub fn with_snake_flag(id: impl Into<String>, text: impl Into<String>, flag: CorrectFlag) -> Self {
        Self {
            id: Some(id.into()),
            text: text.into(),
            correct_camel: None,
            correct_snake: Some(flag),
        }
    }

    /// Normalized correctness: true when the flag is set under either field
    /// spelling, as boolean `true` or the string `"true"`.
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.correct_camel.as_ref().is_some_and(CorrectFlag::is_set)
            || self.correct_snake.as_ref().is_some_and(CorrectFlag::is_set)
    }
}

/// Accepts option ids persisted as either strings or numbers.
fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    let raw = Option::<Raw>::deserialize(deserializer)?;
    Ok(raw.map(|r| match r {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// A multiple-choice question as served by the question repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub category: Category,
    pub sub_category: String,
    pub tier_level: u8,
    pub question_text: String,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    #[serde(default)]
    pub is_production: bool,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    /// Number of selectable options.
    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }
}
