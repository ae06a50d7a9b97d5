// src/models/question.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Difficulty label of a programming problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        };
        f.write_str(label)
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Easy" => Ok(Difficulty::Easy),
            "Medium" => Ok(Difficulty::Medium),
            "Hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[validate(length(max = 10000))]
    pub input: String,
    #[validate(length(max = 10000))]
    pub expected_output: String,
}

/// A programming problem students submit solutions for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Primary key.
    pub id: i64,

    /// Externally assigned, unique identifier used in URLs.
    pub slug: String,

    /// Problem title.
    pub question: String,

    pub description: String,

    pub difficulty: Difficulty,

    pub test_cases: Vec<TestCase>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Editable fields of a question, already validated and sanitized.
#[derive(Debug, Clone)]
pub struct QuestionFields {
    pub question: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub test_cases: Vec<TestCase>,
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    /// Optional external identifier. Derived from the title when omitted.
    #[validate(length(min = 1, max = 100), custom(function = validate_slug))]
    pub slug: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub question: String,
    #[validate(length(min = 1, max = 20000))]
    pub description: String,
    pub difficulty: Difficulty,
    #[validate(nested)]
    #[serde(default, alias = "testcases")]
    pub test_cases: Vec<TestCase>,
}

/// DTO for replacing the editable fields of a question.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 200))]
    pub question: String,
    #[validate(length(min = 1, max = 20000))]
    pub description: String,
    pub difficulty: Difficulty,
    #[validate(nested)]
    #[serde(default, alias = "testcases")]
    pub test_cases: Vec<TestCase>,
}

/// Static segments under `/questions`; a slug equal to one would shadow or be
/// shadowed by that route.
const RESERVED_SLUGS: [&str; 6] = ["all", "question", "by-id", "add", "update", "delete"];

fn validate_slug(slug: &str) -> Result<(), validator::ValidationError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    if !slug.chars().all(allowed) {
        return Err(validator::ValidationError::new("invalid_slug"));
    }
    if RESERVED_SLUGS.contains(&slug.to_ascii_lowercase().as_str()) {
        return Err(validator::ValidationError::new("reserved_slug"));
    }
    Ok(())
}

/// Builds a URL-safe identifier from a title, e.g. "Two Sum" -> "two-sum-1a2b3c".
pub fn slug_from_title(title: &str) -> String {
    let mut base = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            base.push(c.to_ascii_lowercase());
        } else if !base.is_empty() && !base.ends_with('-') {
            base.push('-');
        }
    }
    let base = base.trim_end_matches('-');
    let base: String = base.chars().take(60).collect();

    let suffix = uuid::Uuid::new_v4().simple().to_string();
    if base.is_empty() {
        suffix[..8].to_string()
    } else {
        format!("{}-{}", base.trim_end_matches('-'), &suffix[..6])
    }
}
