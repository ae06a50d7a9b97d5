// src/models/submission.rs

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::config::MAX_GRADE;

/// Source language of a code submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Javascript,
    Java,
    Cpp,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Language::Python => "python",
            Language::Javascript => "javascript",
            Language::Java => "java",
            Language::Cpp => "cpp",
        };
        f.write_str(label)
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "python" => Ok(Language::Python),
            "javascript" => Ok(Language::Javascript),
            "java" => Ok(Language::Java),
            "cpp" => Ok(Language::Cpp),
            other => Err(format!("unknown language '{}'", other)),
        }
    }
}

/// Shape-specific part of a generated comprehension question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum QnaKind {
    /// Multiple choice: exactly four options, the expected answer is one of them.
    Mcq { options: Vec<String> },
    /// Free text: graded against a model answer and a keyword list.
    Descriptive { expected_keywords: Vec<String> },
}

/// One generated question embedded in a submission, together with the
/// student's answer and the AI feedback once they exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QnaItem {
    pub id: Uuid,
    pub question: String,
    #[serde(flatten)]
    pub kind: QnaKind,
    pub expected_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_feedback: Option<String>,
}

/// Where a submission stands in the evaluation workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStage {
    /// Code stored and quiz generated.
    Submitted,
    /// Every quiz item carries a student answer.
    Answered,
    /// Feedback merged and overall grade set.
    Graded,
}

/// A student's code submission and its embedded quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: i64,
    pub student_id: i64,
    /// Primary key of the question this submission answers.
    pub question_id: i64,
    pub code: String,
    pub language: Language,
    pub qna: Vec<QnaItem>,
    pub grade: Option<f64>,
    /// Set when a teacher overrode the AI grade.
    pub evaluated_by_teacher: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Data needed to persist a freshly generated submission.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub student_id: i64,
    pub question_id: i64,
    pub code: String,
    pub language: Language,
    pub qna: Vec<QnaItem>,
}

impl Submission {
    pub fn stage(&self) -> EvaluationStage {
        if self.grade.is_some() {
            EvaluationStage::Graded
        } else if !self.qna.is_empty() && self.qna.iter().all(|q| q.student_answer.is_some()) {
            EvaluationStage::Answered
        } else {
            EvaluationStage::Submitted
        }
    }

    /// Sets `student_answer` on the items named by `answers`.
    ///
    /// All identifiers are checked before anything is touched: an unknown one
    /// rejects the whole batch. Applying the same batch twice leaves the same state.
    pub fn apply_answers(&mut self, answers: &[AnswerEntry]) -> Result<(), MergeError> {
        let known: HashSet<Uuid> = self.qna.iter().map(|q| q.id).collect();
        let unknown: Vec<Uuid> = answers
            .iter()
            .map(|a| a.question_id)
            .filter(|id| !known.contains(id))
            .collect();
        if !unknown.is_empty() {
            return Err(MergeError::UnknownItems(unknown));
        }

        // Later entries for the same id win.
        let by_id: HashMap<Uuid, &str> = answers
            .iter()
            .map(|a| (a.question_id, a.answer.as_str()))
            .collect();

        for item in &mut self.qna {
            if let Some(answer) = by_id.get(&item.id) {
                item.student_answer = Some((*answer).to_string());
            }
        }
        Ok(())
    }

    /// Merges per-item feedback and the overall grade in one step.
    ///
    /// Either every item receives feedback and the grade is set, or nothing changes.
    pub fn apply_feedback(&mut self, report: &FeedbackReport) -> Result<(), MergeError> {
        let by_id: HashMap<Uuid, &str> = report
            .feedbacks
            .iter()
            .map(|f| (f.question_id, f.response.as_str()))
            .collect();

        let known: HashSet<Uuid> = self.qna.iter().map(|q| q.id).collect();
        let unknown: Vec<Uuid> = by_id.keys().filter(|id| !known.contains(id)).copied().collect();
        if !unknown.is_empty() {
            return Err(MergeError::UnknownItems(unknown));
        }

        let missing: Vec<Uuid> = self
            .qna
            .iter()
            .map(|q| q.id)
            .filter(|id| !by_id.contains_key(id))
            .collect();
        if !missing.is_empty() {
            return Err(MergeError::MissingItems(missing));
        }

        if !(0.0..=MAX_GRADE).contains(&report.overall_grade) {
            return Err(MergeError::GradeOutOfRange(report.overall_grade));
        }

        for item in &mut self.qna {
            item.ai_feedback = by_id.get(&item.id).map(|f| (*f).to_string());
        }
        self.grade = Some(report.overall_grade);
        Ok(())
    }
}

/// Why a merge into a submission's quiz was refused.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeError {
    UnknownItems(Vec<Uuid>),
    MissingItems(Vec<Uuid>),
    GradeOutOfRange(f64),
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |ids: &[Uuid]| {
            ids.iter()
                .map(Uuid::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            MergeError::UnknownItems(ids) => write!(f, "unknown quiz item id(s): {}", join(ids)),
            MergeError::MissingItems(ids) => write!(f, "no entry for quiz item id(s): {}", join(ids)),
            MergeError::GradeOutOfRange(g) => {
                write!(f, "grade {} outside 0..={}", g, MAX_GRADE)
            }
        }
    }
}

/// One student answer keyed by QnA item identifier.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEntry {
    pub question_id: Uuid,
    #[validate(length(max = 5000))]
    pub answer: String,
}

/// DTO for the answer-submission request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    #[validate(length(min = 1, max = 50), nested)]
    pub formatted_answers: Vec<AnswerEntry>,
}

/// Feedback for a single QnA item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFeedback {
    pub question_id: Uuid,
    pub response: String,
}

/// Validated output of the feedback generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackReport {
    pub feedbacks: Vec<ItemFeedback>,
    pub overall_grade: f64,
}

/// DTO for submitting code for a question.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCodeRequest {
    #[validate(email)]
    pub email: String,
    /// External identifier (slug) of the question.
    #[validate(length(min = 1, max = 100))]
    pub question_id: String,
    #[validate(length(min = 1, max = 50000))]
    pub code: String,
    pub language: Language,
}

/// DTO for a teacher overriding the grade.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateGradeRequest {
    #[validate(range(min = 0.0, max = 10.0))]
    pub grade: f64,
}
