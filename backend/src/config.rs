// src/config.rs

use std::env;
use std::time::Duration;

use dotenvy::dotenv;
use url::Url;

/// Number of comprehension questions generated per submission.
pub const QUIZ_QUESTION_COUNT: usize = 5;

/// Number of options every multiple-choice question must carry.
pub const MCQ_OPTION_COUNT: usize = 4;

/// Upper bound of the overall grade scale (inclusive).
pub const MAX_GRADE: f64 = 10.0;

/// Longest accepted `CREDENTIAL_TTL` (one year).
pub const MAX_CREDENTIAL_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Name of the signed cookie carrying the credential.
pub const AUTH_COOKIE_NAME: &str = "auth_token";

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Key material for signing cookies. Must be at least 32 bytes.
    pub cookie_secret: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    /// The single origin allowed to make credentialed cross-origin calls.
    pub client_origin: String,
    /// Credential lifetime.
    pub credential_ttl: Duration,
    pub port: u16,
    pub rust_log: String,
    pub teacher_email: Option<String>,
    pub teacher_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let cookie_secret = env::var("COOKIE_SECRET").expect("COOKIE_SECRET must be set");
        assert!(
            cookie_secret.len() >= 32,
            "COOKIE_SECRET must be at least 32 bytes long"
        );

        let gemini_api_key = env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY must be set");

        let gemini_model =
            env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string());

        let client_origin =
            env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "http://localhost:5173".to_string());
        Url::parse(&client_origin).expect("CLIENT_ORIGIN must be a valid URL");

        let credential_ttl = env::var("CREDENTIAL_TTL")
            .ok()
            .map(|raw| {
                parse_ttl(&raw)
                    .expect("CREDENTIAL_TTL must look like 30m, 12h or 7d and be at most 365d")
            })
            .unwrap_or(Duration::from_secs(7 * 24 * 60 * 60));

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5000);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            jwt_secret,
            cookie_secret,
            gemini_api_key,
            gemini_model,
            client_origin,
            credential_ttl,
            port,
            rust_log,
            teacher_email: env::var("TEACHER_EMAIL").ok(),
            teacher_password: env::var("TEACHER_PASSWORD").ok(),
        }
    }
}

/// Parses a lifetime such as `90s`, `30m`, `1h` or `7d`.
/// A bare number is read as seconds.
pub fn parse_ttl(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let amount: u64 = digits.parse().ok()?;

    let multiplier = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return None,
    };

    amount
        .checked_mul(multiplier)
        .filter(|secs| *secs <= MAX_CREDENTIAL_TTL_SECS)
        .map(Duration::from_secs)
}
