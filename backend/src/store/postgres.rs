// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, prelude::FromRow, types::Json};

use super::{QuestionRepository, SubmissionRepository, UserRepository};
use crate::{
    error::AppError,
    models::{
        question::{Question, QuestionFields, TestCase},
        submission::{NewSubmission, QnaItem, Submission},
        user::{NewUser, User},
    },
};

/// PostgreSQL-backed store. Test cases and quiz items live in JSONB columns.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Postgres error code for unique violation is 23505.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "23505")
}

/// Postgres error code for foreign key violation is 23503.
fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "23503")
}

#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    slug: String,
    question: String,
    description: String,
    difficulty: String,
    test_cases: Json<Vec<TestCase>>,
    created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = AppError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        Ok(Question {
            id: row.id,
            slug: row.slug,
            question: row.question,
            description: row.description,
            difficulty: row.difficulty.parse().map_err(AppError::InternalServerError)?,
            test_cases: row.test_cases.0,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct SubmissionRow {
    id: i64,
    student_id: i64,
    question_id: i64,
    code: String,
    language: String,
    qna: Json<Vec<QnaItem>>,
    grade: Option<f64>,
    evaluated_by_teacher: bool,
    created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = AppError;

    fn try_from(row: SubmissionRow) -> Result<Self, Self::Error> {
        Ok(Submission {
            id: row.id,
            student_id: row.student_id,
            question_id: row.question_id,
            code: row.code,
            language: row.language.parse().map_err(AppError::InternalServerError)?,
            qna: row.qna.0,
            grade: row.grade,
            evaluated_by_teacher: row.evaluated_by_teacher,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    password: String,
    role: String,
    created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password: row.password,
            role: row.role.parse().map_err(AppError::InternalServerError)?,
            created_at: row.created_at,
        })
    }
}

const QUESTION_COLUMNS: &str =
    "id, slug, question, description, difficulty, test_cases, created_at";
const SUBMISSION_COLUMNS: &str =
    "id, student_id, question_id, code, language, qna, grade, evaluated_by_teacher, created_at";
const USER_COLUMNS: &str = "id, name, email, password, role, created_at";

#[async_trait]
impl QuestionRepository for PgStore {
    async fn list_questions(&self) -> Result<Vec<Question>, AppError> {
        let rows: Vec<QuestionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM questions ORDER BY id",
            QUESTION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list questions: {:?}", e);
            AppError::from(e)
        })?;

        rows.into_iter().map(Question::try_from).collect()
    }

    async fn find_question(&self, id: i64) -> Result<Option<Question>, AppError> {
        let row: Option<QuestionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM questions WHERE id = $1",
            QUESTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Question::try_from).transpose()
    }

    async fn find_question_by_slug(&self, slug: &str) -> Result<Option<Question>, AppError> {
        let row: Option<QuestionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM questions WHERE slug = $1",
            QUESTION_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Question::try_from).transpose()
    }

    async fn insert_question(
        &self,
        slug: &str,
        fields: QuestionFields,
    ) -> Result<Question, AppError> {
        let row: QuestionRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO questions (slug, question, description, difficulty, test_cases)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            QUESTION_COLUMNS
        ))
        .bind(slug)
        .bind(&fields.question)
        .bind(&fields.description)
        .bind(fields.difficulty.to_string())
        .bind(Json(&fields.test_cases))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Question '{}' already exists", slug))
            } else {
                tracing::error!("Failed to create question: {:?}", e);
                AppError::from(e)
            }
        })?;

        row.try_into()
    }

    async fn update_question(
        &self,
        slug: &str,
        fields: QuestionFields,
    ) -> Result<Option<Question>, AppError> {
        let row: Option<QuestionRow> = sqlx::query_as(&format!(
            r#"
            UPDATE questions
            SET question = $2, description = $3, difficulty = $4, test_cases = $5
            WHERE slug = $1
            RETURNING {}
            "#,
            QUESTION_COLUMNS
        ))
        .bind(slug)
        .bind(&fields.question)
        .bind(&fields.description)
        .bind(fields.difficulty.to_string())
        .bind(Json(&fields.test_cases))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update question: {:?}", e);
            AppError::from(e)
        })?;

        row.map(Question::try_from).transpose()
    }

    async fn delete_question(&self, slug: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM questions WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    AppError::Conflict(format!("Question '{}' has submissions", slug))
                } else {
                    tracing::error!("Failed to delete question: {:?}", e);
                    AppError::from(e)
                }
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SubmissionRepository for PgStore {
    async fn insert_submission(&self, new: NewSubmission) -> Result<Submission, AppError> {
        let row: SubmissionRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO submissions (student_id, question_id, code, language, qna)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            SUBMISSION_COLUMNS
        ))
        .bind(new.student_id)
        .bind(new.question_id)
        .bind(&new.code)
        .bind(new.language.to_string())
        .bind(Json(&new.qna))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to store submission: {:?}", e);
            AppError::from(e)
        })?;

        row.try_into()
    }

    async fn find_submission(&self, id: i64) -> Result<Option<Submission>, AppError> {
        let row: Option<SubmissionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM submissions WHERE id = $1",
            SUBMISSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Submission::try_from).transpose()
    }

    async fn list_submissions(&self) -> Result<Vec<Submission>, AppError> {
        let rows: Vec<SubmissionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM submissions ORDER BY created_at DESC, id DESC",
            SUBMISSION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Submission::try_from).collect()
    }

    async fn save_submission(&self, submission: &Submission) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE submissions
            SET qna = $2, grade = $3, evaluated_by_teacher = $4
            WHERE id = $1
            "#,
        )
        .bind(submission.id)
        .bind(Json(&submission.qna))
        .bind(submission.grade)
        .bind(submission.evaluated_by_teacher)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to save submission {}: {:?}", submission.id, e);
            AppError::from(e)
        })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn insert_user(&self, new: NewUser) -> Result<User, AppError> {
        let row: UserRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (name, email, password, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password)
        .bind(new.role.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Email '{}' is already registered", new.email))
            } else {
                tracing::error!("Failed to register user: {:?}", e);
                AppError::from(e)
            }
        })?;

        row.try_into()
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }
}
