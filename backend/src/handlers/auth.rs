// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::{SignedCookieJar, WithRejection};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{LoginRequest, NewUser, Role, SignupRequest},
    state::AppState,
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, auth_cookie, current_user, issue_credential, removal_cookie},
    },
};

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registers a new student account and signs it in.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created, the user object (excluding password) and the auth cookie.
pub async fn signup(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    WithRejection(Json(payload), _): WithRejection<Json<SignupRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = state
        .store
        .insert_user(NewUser {
            name: payload.name.trim().to_string(),
            email: normalize_email(&payload.email),
            password: hash_password(&payload.password)?,
            role: Role::Student,
        })
        .await?;

    let token = issue_credential(
        user.id,
        &user.email,
        state.config.credential_ttl,
        &state.config.jwt_secret,
    )?;

    tracing::info!(user = user.id, "account registered");
    Ok((StatusCode::CREATED, jar.add(auth_cookie(token)), Json(user)))
}

/// Authenticates a user and stores a credential in the signed cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = state
        .store
        .find_user_by_email(&normalize_email(&payload.email))
        .await?
        .ok_or(AppError::AuthError("User not registered".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Incorrect password".to_string()));
    }

    let token = issue_credential(
        user.id,
        &user.email,
        state.config.credential_ttl,
        &state.config.jwt_secret,
    )?;

    Ok((jar.add(auth_cookie(token)), Json(user)))
}

/// Returns the account behind the current cookie.
pub async fn status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = current_user(&state, &claims).await?;

    if user.email != claims.email {
        return Err(AppError::AuthError("Token does not match account".to_string()));
    }

    Ok(Json(user))
}

/// Clears the auth cookie. Credentials are stateless, so nothing else is revoked.
pub async fn logout(jar: SignedCookieJar) -> impl IntoResponse {
    (
        jar.remove(removal_cookie()),
        Json(json!({ "message": "Logged out" })),
    )
}
