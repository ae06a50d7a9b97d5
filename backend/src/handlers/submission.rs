// src/handlers/submission.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use validator::Validate;

use crate::{
    error::AppError,
    evaluation,
    models::{
        submission::{
            EvaluateRequest, EvaluationStage, SubmitCodeRequest, Submission, UpdateGradeRequest,
        },
        user::{Role, User},
    },
    state::AppState,
    utils::jwt::{Claims, current_user},
};

/// Submission plus its derived workflow stage.
#[derive(Serialize)]
struct SubmissionView {
    #[serde(flatten)]
    submission: Submission,
    stage: EvaluationStage,
}

impl From<Submission> for SubmissionView {
    fn from(submission: Submission) -> Self {
        let stage = submission.stage();
        Self { submission, stage }
    }
}

/// Students may only touch their own submissions; teachers may touch any.
fn ensure_owner_or_teacher(caller: &User, submission: &Submission) -> Result<(), AppError> {
    if caller.role == Role::Teacher || caller.id == submission.student_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Submission belongs to another student".to_string(),
        ))
    }
}

async fn load_submission(state: &AppState, id: i64) -> Result<Submission, AppError> {
    state
        .store
        .find_submission(id)
        .await?
        .ok_or(AppError::NotFound("Submission not found".to_string()))
}

/// Stores a code submission and generates its comprehension quiz.
///
/// * The student is identified by `email`; students may only submit as themselves.
/// * Blocks until the language model has produced the quiz.
pub async fn submit_code(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(slug), _): WithRejection<Path<String>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<SubmitCodeRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.question_id != slug {
        return Err(AppError::BadRequest(
            "questionId does not match the question in the URL".to_string(),
        ));
    }

    let caller = current_user(&state, &claims).await?;
    let email = payload.email.trim().to_lowercase();
    if caller.role != Role::Teacher && caller.email != email {
        return Err(AppError::Forbidden(
            "Students can only submit their own code".to_string(),
        ));
    }

    let student = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or(AppError::NotFound("Student not found".to_string()))?;

    let question = state
        .store
        .find_question_by_slug(&slug)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    let submission = evaluation::start_submission(
        state.store.as_ref(),
        state.llm.as_ref(),
        &student,
        &question,
        payload.code,
        payload.language,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(SubmissionView::from(submission))))
}

/// Retrieves a submission with its quiz.
pub async fn get_submission(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let caller = current_user(&state, &claims).await?;
    let submission = load_submission(&state, id).await?;
    ensure_owner_or_teacher(&caller, &submission)?;

    Ok(Json(SubmissionView::from(submission)))
}

/// Lists all submissions, newest first.
/// Teacher only.
pub async fn list_submissions(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let submissions: Vec<SubmissionView> = state
        .store
        .list_submissions()
        .await?
        .into_iter()
        .map(SubmissionView::from)
        .collect();

    Ok(Json(submissions))
}

/// Records the student's quiz answers, then grades the submission.
///
/// Returns `{feedbacks, overallGrade}`. When grading fails the answers stay
/// recorded and `POST /submissions/{id}/feedback` can retry the grading.
pub async fn evaluate_submission(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<EvaluateRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let caller = current_user(&state, &claims).await?;
    let submission = load_submission(&state, id).await?;
    ensure_owner_or_teacher(&caller, &submission)?;

    let (_, report) = evaluation::answer_and_grade(
        state.store.as_ref(),
        state.llm.as_ref(),
        submission,
        &payload.formatted_answers,
    )
    .await?;

    Ok(Json(report))
}

/// Retries grading for a submission whose answers are recorded but which has no grade yet.
pub async fn regrade_submission(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let caller = current_user(&state, &claims).await?;
    let submission = load_submission(&state, id).await?;
    ensure_owner_or_teacher(&caller, &submission)?;

    let (_, report) =
        evaluation::grade(state.store.as_ref(), state.llm.as_ref(), submission).await?;

    Ok(Json(report))
}

/// Overrides the grade of a submission.
/// Teacher only.
pub async fn update_grade(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateGradeRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let submission = load_submission(&state, id).await?;
    let submission = evaluation::override_grade(state.store.as_ref(), submission, payload.grade).await?;

    Ok(Json(SubmissionView::from(submission)))
}
