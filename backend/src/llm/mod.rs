// src/llm/mod.rs

//! Language-model access and the two generators built on top of it.
//!
//! Generators build a prompt, hand it to a [`LanguageModel`], pull the JSON
//! payload out of the free-form reply and validate it into closed types
//! before anything downstream sees it.

pub mod feedback;
pub mod gemini;
pub mod quiz;

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

pub use feedback::generate_feedback;
pub use gemini::GeminiClient;
pub use quiz::generate_quiz;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The external call itself failed (network, HTTP status, empty reply).
    #[error("language model request failed: {0}")]
    Request(String),

    /// The model replied, but not with the payload we asked for.
    #[error("malformed language model output: {reason}")]
    Parse { reason: String, raw: String },
}

impl GenerationError {
    pub fn parse(reason: impl Into<String>, raw: &str) -> Self {
        GenerationError::Parse {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }
}

/// A text-in, text-out completion endpoint.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

static JSON_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("static regex"));
static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("static regex"));

/// Outermost `[...]` span of a reply, ignoring prose or code fences around it.
pub(crate) fn extract_json_array(text: &str) -> Option<&str> {
    JSON_ARRAY.find(text).map(|m| m.as_str())
}

/// Outermost `{...}` span of a reply.
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    JSON_OBJECT.find(text).map(|m| m.as_str())
}
