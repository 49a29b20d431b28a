use std::sync::Arc;

use actix_web::{get, web, HttpResponse};

use crate::{app_state::AppState, auth::AuthenticatedUser, errors::AppError};

/// Quiz content is served read-only here; any authenticated caller may look
/// a quiz up, the guard having already vouched for the token.
#[get("/quizzes/{quizid}")]
pub async fn get_quiz(
    state: web::Data<Arc<AppState>>,
    quizid: web::Path<String>,
    _auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let quiz = state.quiz_service.get_quiz(&quizid).await?;
    Ok(HttpResponse::Ok().json(quiz))
}
