//! Prompt chain construction — turns typed form questions into a deterministic,
//! schema-constrained instruction set for the conversational backend.
//!
//! Every answer is requested as a minimal single-key JSON object whose shape is
//! fixed per question kind, so downstream parsing never deals with free text.

pub mod builder;
pub mod prompts;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use builder::{build_chain, build_context_prompt, build_question_prompt, build_system_prompt};

/// Preambles seed the conversation and get a longer budget than answers.
pub const PREAMBLE_TIMEOUT: Duration = Duration::from_secs(60);
pub const QUESTION_TIMEOUT: Duration = Duration::from_secs(30);

const SCALAR_TYPES: &[&str] = &["text", "email", "number", "tel", "url", "search", "password"];
const TEXTAREA_TYPES: &[&str] = &["textarea"];
const SINGLE_CHOICE_TYPES: &[&str] = &["radio", "select", "dropdown"];
const MULTI_CHOICE_TYPES: &[&str] = &["checkbox", "multiselect"];
const DATE_TYPES: &[&str] = &["date"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported question type: {0}")]
pub struct UnsupportedQuestionTypeError(pub String);

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error(transparent)]
    UnsupportedQuestionType(#[from] UnsupportedQuestionTypeError),

    #[error("Failed to serialize prompt context: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Answer-shape family a raw form input type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Scalar,
    Textarea,
    SingleChoice,
    MultiChoice,
    Date,
}

impl QuestionKind {
    /// Maps a raw form input type (`"email"`, `"radio"`, ...) to its kind.
    pub fn classify(raw: &str) -> Result<Self, UnsupportedQuestionTypeError> {
        let kind = if SCALAR_TYPES.contains(&raw) {
            QuestionKind::Scalar
        } else if TEXTAREA_TYPES.contains(&raw) {
            QuestionKind::Textarea
        } else if SINGLE_CHOICE_TYPES.contains(&raw) {
            QuestionKind::SingleChoice
        } else if MULTI_CHOICE_TYPES.contains(&raw) {
            QuestionKind::MultiChoice
        } else if DATE_TYPES.contains(&raw) {
            QuestionKind::Date
        } else {
            return Err(UnsupportedQuestionTypeError(raw.to_string()));
        };
        Ok(kind)
    }
}

fn default_required() -> bool {
    true
}

/// A single form question, immutable for the duration of a resolution round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(alias = "questionId")]
    pub id: String,
    #[serde(default)]
    pub label_text: String,
    /// Raw form input type, classified lazily so unknown types stay local to one question.
    #[serde(rename = "type")]
    pub input_type: String,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default, alias = "relevantDBKeys")]
    pub relevant_paths: Vec<String>,
}

impl Question {
    pub fn kind(&self) -> Result<QuestionKind, UnsupportedQuestionTypeError> {
        QuestionKind::classify(&self.input_type)
    }
}

/// Job posting context embedded in the system preamble when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetails {
    #[serde(default, alias = "jobTitle")]
    pub title: Option<String>,
    #[serde(default, alias = "jobDescription")]
    pub description: Option<String>,
    #[serde(default, alias = "jobLocation")]
    pub location: Option<String>,
    #[serde(default, alias = "jobURL")]
    pub url: Option<String>,
}

impl JobDetails {
    pub fn has_context(&self) -> bool {
        self.title.is_some() || self.description.is_some() || self.location.is_some()
    }
}

/// One instruction in a prompt chain.
///
/// `copy_output == false` steps only seed context. `copy_output == true` steps
/// map 1:1, in order, to the questions they answer.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptStep {
    pub text: String,
    pub copy_output: bool,
    pub timeout: Duration,
    pub strip_punctuation: bool,
}

impl PromptStep {
    pub fn context(text: String) -> Self {
        Self {
            text,
            copy_output: false,
            timeout: PREAMBLE_TIMEOUT,
            strip_punctuation: false,
        }
    }

    pub fn answer(text: String) -> Self {
        Self {
            text,
            copy_output: true,
            timeout: QUESTION_TIMEOUT,
            strip_punctuation: true,
        }
    }
}

/// A question whose step could not be built.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedQuestion {
    /// Position in the `questions` slice handed to [`build_chain`].
    pub index: usize,
    pub error: UnsupportedQuestionTypeError,
}

/// Output of [`build_chain`]: the steps to send plus any questions left out.
#[derive(Debug, Clone, Default)]
pub struct PromptChain {
    pub steps: Vec<PromptStep>,
    pub skipped: Vec<SkippedQuestion>,
}

impl PromptChain {
    pub fn answer_count(&self) -> usize {
        self.steps.iter().filter(|s| s.copy_output).count()
    }
}
