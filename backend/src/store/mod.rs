// src/store/mod.rs

//! Persistence for questions, submissions and users.
//!
//! Handlers talk to the [`Store`] trait object held in the application state.
//! [`PgStore`] backs production deployments; [`MemoryStore`] serves local runs
//! without a database and the integration tests. Both keep a submission as a
//! single document (its quiz items embedded), so saving one is a single write.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        question::{Question, QuestionFields},
        submission::{NewSubmission, Submission},
        user::{NewUser, User},
    },
};

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    async fn list_questions(&self) -> Result<Vec<Question>, AppError>;

    async fn find_question(&self, id: i64) -> Result<Option<Question>, AppError>;

    async fn find_question_by_slug(&self, slug: &str) -> Result<Option<Question>, AppError>;

    /// Fails with `Conflict` when the slug is taken.
    async fn insert_question(
        &self,
        slug: &str,
        fields: QuestionFields,
    ) -> Result<Question, AppError>;

    async fn update_question(
        &self,
        slug: &str,
        fields: QuestionFields,
    ) -> Result<Option<Question>, AppError>;

    /// Returns whether a question was removed.
    async fn delete_question(&self, slug: &str) -> Result<bool, AppError>;
}

#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn insert_submission(&self, new: NewSubmission) -> Result<Submission, AppError>;

    async fn find_submission(&self, id: i64) -> Result<Option<Submission>, AppError>;

    /// Newest first.
    async fn list_submissions(&self) -> Result<Vec<Submission>, AppError>;

    /// Replaces the mutable part of the aggregate (quiz items, grade,
    /// teacher flag) in one write. Returns whether the submission existed.
    async fn save_submission(&self, submission: &Submission) -> Result<bool, AppError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn insert_user(&self, new: NewUser) -> Result<User, AppError>;

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
}

pub trait Store: QuestionRepository + SubmissionRepository + UserRepository {}

impl<T> Store for T where T: QuestionRepository + SubmissionRepository + UserRepository {}
