// src/store/memory.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{QuestionRepository, SubmissionRepository, UserRepository};
use crate::{
    error::AppError,
    models::{
        question::{Question, QuestionFields},
        submission::{NewSubmission, Submission},
        user::{NewUser, User},
    },
};

#[derive(Default)]
struct Tables {
    questions: BTreeMap<i64, Question>,
    submissions: BTreeMap<i64, Submission>,
    users: BTreeMap<i64, User>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local store with the same key and conflict rules as [`super::PgStore`].
/// Every operation holds the lock for its whole duration, so each write is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuestionRepository for MemoryStore {
    async fn list_questions(&self) -> Result<Vec<Question>, AppError> {
        Ok(self.tables.read().await.questions.values().cloned().collect())
    }

    async fn find_question(&self, id: i64) -> Result<Option<Question>, AppError> {
        Ok(self.tables.read().await.questions.get(&id).cloned())
    }

    async fn find_question_by_slug(&self, slug: &str) -> Result<Option<Question>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.questions.values().find(|q| q.slug == slug).cloned())
    }

    async fn insert_question(
        &self,
        slug: &str,
        fields: QuestionFields,
    ) -> Result<Question, AppError> {
        let mut tables = self.tables.write().await;
        if tables.questions.values().any(|q| q.slug == slug) {
            return Err(AppError::Conflict(format!(
                "Question '{}' already exists",
                slug
            )));
        }

        let question = Question {
            id: tables.next_id(),
            slug: slug.to_string(),
            question: fields.question,
            description: fields.description,
            difficulty: fields.difficulty,
            test_cases: fields.test_cases,
            created_at: Some(Utc::now()),
        };
        tables.questions.insert(question.id, question.clone());
        Ok(question)
    }

    async fn update_question(
        &self,
        slug: &str,
        fields: QuestionFields,
    ) -> Result<Option<Question>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(question) = tables.questions.values_mut().find(|q| q.slug == slug) else {
            return Ok(None);
        };

        question.question = fields.question;
        question.description = fields.description;
        question.difficulty = fields.difficulty;
        question.test_cases = fields.test_cases;
        Ok(Some(question.clone()))
    }

    async fn delete_question(&self, slug: &str) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let Some(id) = tables
            .questions
            .values()
            .find(|q| q.slug == slug)
            .map(|q| q.id)
        else {
            return Ok(false);
        };

        if tables.submissions.values().any(|s| s.question_id == id) {
            return Err(AppError::Conflict(format!(
                "Question '{}' has submissions",
                slug
            )));
        }

        tables.questions.remove(&id);
        Ok(true)
    }
}

#[async_trait]
impl SubmissionRepository for MemoryStore {
    async fn insert_submission(&self, new: NewSubmission) -> Result<Submission, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&new.student_id) {
            return Err(AppError::InternalServerError(format!(
                "submission references missing user {}",
                new.student_id
            )));
        }
        if !tables.questions.contains_key(&new.question_id) {
            return Err(AppError::InternalServerError(format!(
                "submission references missing question {}",
                new.question_id
            )));
        }

        let submission = Submission {
            id: tables.next_id(),
            student_id: new.student_id,
            question_id: new.question_id,
            code: new.code,
            language: new.language,
            qna: new.qna,
            grade: None,
            evaluated_by_teacher: false,
            created_at: Some(Utc::now()),
        };
        tables.submissions.insert(submission.id, submission.clone());
        Ok(submission)
    }

    async fn find_submission(&self, id: i64) -> Result<Option<Submission>, AppError> {
        Ok(self.tables.read().await.submissions.get(&id).cloned())
    }

    async fn list_submissions(&self) -> Result<Vec<Submission>, AppError> {
        // Ids grow monotonically, so reverse id order is newest first.
        Ok(self
            .tables
            .read()
            .await
            .submissions
            .values()
            .rev()
            .cloned()
            .collect())
    }

    async fn save_submission(&self, submission: &Submission) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables.submissions.get_mut(&submission.id) else {
            return Ok(false);
        };

        stored.qna = submission.qna.clone();
        stored.grade = submission.grade;
        stored.evaluated_by_teacher = submission.evaluated_by_teacher;
        Ok(true)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, new: NewUser) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == new.email) {
            return Err(AppError::Conflict(format!(
                "Email '{}' is already registered",
                new.email
            )));
        }

        let user = User {
            id: tables.next_id(),
            name: new.name,
            email: new.email,
            password: new.password,
            role: new.role,
            created_at: Some(Utc::now()),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }
}
