use std::sync::Arc;

use crate::{
    errors::{AppError, AppResult},
    models::domain::Quiz,
    repositories::QuizRepository,
};

/// Quiz CRUD is another service's concern; this one answers resource-exists
/// reads for callers that already passed the guard.
pub struct QuizService {
    repository: Arc<dyn QuizRepository>,
}

impl QuizService {
    pub fn new(repository: Arc<dyn QuizRepository>) -> Self {
        Self { repository }
    }

    pub async fn get_quiz(&self, id: &str) -> AppResult<Quiz> {
        let quiz = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", id)))?;

        Ok(quiz)
    }
}
