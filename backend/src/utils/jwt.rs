// src/utils/jwt.rs

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::{
    SignedCookieJar,
    cookie::{Cookie, SameSite},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    config::AUTH_COOKIE_NAME,
    error::AppError,
    models::user::{Role, User},
    state::AppState,
};

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    pub email: String,
    /// Expiration time as Unix timestamp.
    pub exp: u64,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))
    }
}

fn now_secs() -> Result<u64, AppError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Signs a credential for the user that expires `ttl` from now.
pub fn issue_credential(
    user_id: i64,
    email: &str,
    ttl: Duration,
    secret: &str,
) -> Result<String, AppError> {
    let exp = now_secs()?
        .checked_add(ttl.as_secs())
        .ok_or_else(|| AppError::InternalServerError("credential ttl overflows".to_string()))?;
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_owned(),
        exp,
    };

    encode_claims(&claims, secret)
}

pub(crate) fn encode_claims(claims: &Claims, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a credential.
///
/// Expiry is absolute: no clock leeway is granted.
pub fn verify_credential(token: &str, secret: &str) -> Result<Claims, AppError> {
    if token.trim().is_empty() {
        return Err(AppError::AuthError("Token Not Received".to_string()));
    }

    let mut validation = Validation::default();
    validation.leeway = 0;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::AuthError("Token Expired".to_string())
        }
        _ => AppError::AuthError("Invalid token".to_string()),
    })?;

    Ok(token_data.claims)
}

/// Builds the signed, httpOnly cookie carrying a credential.
pub fn auth_cookie(token: String) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookie template used to clear the credential.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(AUTH_COOKIE_NAME).path("/").build()
}

/// Axum Middleware: Authentication.
///
/// Reads the credential from the signed `auth_token` cookie. If valid,
/// injects `Claims` into the request extensions for handlers to use.
/// A missing, tampered or expired cookie yields 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(AUTH_COOKIE_NAME)
        .map(|cookie| cookie.value().to_owned())
        .ok_or_else(|| AppError::AuthError("Token Not Received".to_string()))?;

    let claims = verify_credential(&token, &state.config.jwt_secret)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Axum Middleware: Teacher Authorization.
///
/// Must be used AFTER `auth_middleware`. Loads the caller's account and
/// requires the teacher role; the loaded `User` is injected for handlers.
pub async fn teacher_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .cloned()
        .ok_or_else(|| AppError::AuthError("Token Not Received".to_string()))?;

    let user = current_user(&state, &claims).await?;
    if user.role != Role::Teacher {
        return Err(AppError::Forbidden("Teacher role required".to_string()));
    }

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Resolves the account behind a verified credential.
pub async fn current_user(state: &AppState, claims: &Claims) -> Result<User, AppError> {
    state
        .store
        .find_user(claims.user_id()?)
        .await?
        .ok_or_else(|| AppError::AuthError("User no longer exists".to_string()))
}
