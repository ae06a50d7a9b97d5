// src/evaluation.rs

//! Submission lifecycle: `Submitted -> Answered -> Graded`.
//!
//! Each transition loads the whole submission, changes it in memory and
//! writes it back in a single save. Answers are saved on their own so a
//! failed grading leaves the submission `Answered`; feedback and grade are
//! always saved together.

use crate::{
    error::AppError,
    llm::{LanguageModel, generate_feedback, generate_quiz},
    models::{
        question::Question,
        submission::{
            AnswerEntry, EvaluationStage, FeedbackReport, Language, NewSubmission, Submission,
        },
        user::User,
    },
    store::Store,
};

/// Stores a code submission together with its freshly generated quiz.
/// Nothing is persisted if quiz generation fails.
pub async fn start_submission(
    store: &dyn Store,
    llm: &dyn LanguageModel,
    student: &User,
    question: &Question,
    code: String,
    language: Language,
) -> Result<Submission, AppError> {
    let qna = generate_quiz(llm, question, &code, language).await?;

    let submission = store
        .insert_submission(NewSubmission {
            student_id: student.id,
            question_id: question.id,
            code,
            language,
            qna,
        })
        .await?;

    tracing::info!(
        submission = submission.id,
        student = student.id,
        question = %question.slug,
        "code submitted"
    );
    Ok(submission)
}

/// `Submitted -> Answered -> Graded`: merges the student's answers, saves
/// them, then immediately requests feedback and grades the submission.
pub async fn answer_and_grade(
    store: &dyn Store,
    llm: &dyn LanguageModel,
    mut submission: Submission,
    answers: &[AnswerEntry],
) -> Result<(Submission, FeedbackReport), AppError> {
    if submission.stage() == EvaluationStage::Graded {
        return Err(AppError::Conflict(format!(
            "Submission {} is already graded",
            submission.id
        )));
    }

    submission
        .apply_answers(answers)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let unanswered: Vec<String> = submission
        .qna
        .iter()
        .filter(|q| q.student_answer.is_none())
        .map(|q| q.id.to_string())
        .collect();
    if !unanswered.is_empty() {
        return Err(AppError::BadRequest(format!(
            "missing answers for quiz item(s): {}",
            unanswered.join(", ")
        )));
    }

    persist(store, &submission).await?;
    tracing::info!(submission = submission.id, "answers recorded");

    grade(store, llm, submission).await
}

/// `Answered -> Graded`: requests feedback for a submission whose answers are
/// all recorded and saves feedback and grade in one write.
///
/// Also serves as the repair path for submissions left `Answered` by a failed
/// grading attempt.
pub async fn grade(
    store: &dyn Store,
    llm: &dyn LanguageModel,
    mut submission: Submission,
) -> Result<(Submission, FeedbackReport), AppError> {
    match submission.stage() {
        EvaluationStage::Answered => {}
        EvaluationStage::Submitted => {
            return Err(AppError::Conflict(format!(
                "Submission {} has unanswered quiz items",
                submission.id
            )));
        }
        EvaluationStage::Graded => {
            return Err(AppError::Conflict(format!(
                "Submission {} is already graded",
                submission.id
            )));
        }
    }

    let question = store
        .find_question(submission.question_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

    let report = generate_feedback(llm, &question, &submission).await?;

    submission
        .apply_feedback(&report)
        .map_err(|e| AppError::ParseFailure(e.to_string()))?;

    persist(store, &submission).await?;
    tracing::info!(
        submission = submission.id,
        grade = report.overall_grade,
        "submission graded"
    );
    Ok((submission, report))
}

/// Teacher override of the overall grade.
///
/// Only answered or graded submissions can be graded by hand; a grade on a
/// `Submitted` submission would lock the student out of answering.
pub async fn override_grade(
    store: &dyn Store,
    mut submission: Submission,
    grade: f64,
) -> Result<Submission, AppError> {
    if submission.stage() == EvaluationStage::Submitted {
        return Err(AppError::Conflict(format!(
            "Submission {} has not been answered yet",
            submission.id
        )));
    }

    submission.grade = Some(grade);
    submission.evaluated_by_teacher = true;
    persist(store, &submission).await?;

    tracing::info!(submission = submission.id, grade, "grade set by teacher");
    Ok(submission)
}

async fn persist(store: &dyn Store, submission: &Submission) -> Result<(), AppError> {
    if store.save_submission(submission).await? {
        Ok(())
    } else {
        Err(AppError::NotFound("Submission not found".to_string()))
    }
}
