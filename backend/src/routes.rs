// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{auth, health, question, submission},
    state::AppState,
    utils::jwt::{auth_middleware, teacher_middleware},
};

fn cors_layer(client_origin: &str) -> CorsLayer {
    let origin = match client_origin.trim_end_matches('/').parse::<HeaderValue>() {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(e) => {
            tracing::warn!("Ignoring unusable CLIENT_ORIGIN {:?}: {}", client_origin, e);
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    // Cookies travel cross-origin, so the origin must be explicit.
    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, questions, submissions).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store, language model, config).
pub fn create_router(state: AppState) -> Router {
    let require_auth = || middleware::from_fn_with_state(state.clone(), auth_middleware);
    let require_teacher = || middleware::from_fn_with_state(state.clone(), teacher_middleware);

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .merge(
            Router::new()
                .route("/status", get(auth::status))
                .layer(require_auth()),
        );

    let question_routes = Router::new()
        .route("/all", get(question::list_questions))
        .route("/question/{id}", get(question::get_question))
        .route("/by-id/{id}", get(question::get_question_by_id))
        .merge(
            Router::new()
                .route("/{id}/submit", post(submission::submit_code))
                .layer(require_auth()),
        )
        // Auth first, then the teacher check
        .merge(
            Router::new()
                .route("/add", post(question::create_question))
                .route("/update/{id}", put(question::update_question))
                .route("/delete/{id}", delete(question::delete_question))
                .layer(require_teacher())
                .layer(require_auth()),
        );

    let submission_routes = Router::new()
        .route("/{id}", get(submission::get_submission))
        .route("/evaluation/{id}", post(submission::evaluate_submission))
        .route("/{id}/feedback", post(submission::regrade_submission))
        .merge(
            Router::new()
                .route("/board/all", get(submission::list_submissions))
                .route("/updateGrade/{id}", put(submission::update_grade))
                .layer(require_teacher()),
        )
        .layer(require_auth());

    Router::new()
        .route("/health", get(health::health))
        .nest("/auth", auth_routes)
        .nest("/questions", question_routes)
        .nest("/submissions", submission_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.client_origin))
        .with_state(state)
}
