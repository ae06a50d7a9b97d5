// src/handlers/question.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::question::{
        CreateQuestionRequest, Difficulty, QuestionFields, TestCase, UpdateQuestionRequest,
        slug_from_title,
    },
    state::AppState,
    utils::html::sanitize_description,
};

fn fields(
    question: String,
    description: &str,
    difficulty: Difficulty,
    test_cases: Vec<TestCase>,
) -> QuestionFields {
    QuestionFields {
        question: question.trim().to_string(),
        description: sanitize_description(description),
        difficulty,
        test_cases,
    }
}

/// Lists every question in the catalog.
pub async fn list_questions(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.store.list_questions().await?))
}

/// Retrieves a question by its external identifier.
pub async fn get_question(
    State(state): State<AppState>,
    WithRejection(Path(slug), _): WithRejection<Path<String>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let question = state
        .store
        .find_question_by_slug(&slug)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(question))
}

/// Retrieves a question by primary key.
pub async fn get_question_by_id(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let question = state
        .store
        .find_question(id)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(question))
}

/// Creates a new question.
/// Teacher only.
pub async fn create_question(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<CreateQuestionRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let slug = payload
        .slug
        .unwrap_or_else(|| slug_from_title(&payload.question));
    let question = state
        .store
        .insert_question(
            &slug,
            fields(
                payload.question,
                &payload.description,
                payload.difficulty,
                payload.test_cases,
            ),
        )
        .await?;

    tracing::info!(question = %question.slug, "question added");
    Ok((StatusCode::CREATED, Json(question)))
}

/// Replaces the editable fields of a question.
/// Teacher only.
pub async fn update_question(
    State(state): State<AppState>,
    WithRejection(Path(slug), _): WithRejection<Path<String>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateQuestionRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let question = state
        .store
        .update_question(
            &slug,
            fields(
                payload.question,
                &payload.description,
                payload.difficulty,
                payload.test_cases,
            ),
        )
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(question))
}

/// Deletes a question by its external identifier.
/// Teacher only. Questions that already have submissions are kept.
pub async fn delete_question(
    State(state): State<AppState>,
    WithRejection(Path(slug), _): WithRejection<Path<String>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    if !state.store.delete_question(&slug).await? {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    tracing::info!(question = %slug, "question deleted");
    Ok((
        StatusCode::OK,
        Json(json!({ "message": "question deleted successfully" })),
    ))
}
