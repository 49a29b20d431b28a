use std::sync::Arc;

use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::request::{SignInRequest, SignUpRequest},
};

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: String,
    #[serde(default)]
    redirect_uri: Option<String>,
}

// Must match the redirect_uri used in the initial authorization request
const DEFAULT_REDIRECT_URI: &str = "http://localhost:5173/auth/callback";

#[post("/auth/signup")]
pub async fn signup(
    state: web::Data<Arc<AppState>>,
    request: web::Json<SignUpRequest>,
) -> Result<HttpResponse, AppError> {
    let response = state.user_service.signup(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(response))
}

#[post("/auth/signin")]
pub async fn signin(
    state: web::Data<Arc<AppState>>,
    request: web::Json<SignInRequest>,
) -> Result<HttpResponse, AppError> {
    let response = state.user_service.signin(request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// The presented token is the one revoked; the middleware has already
/// validated it and parked its claims in the request.
#[post("/auth/signout")]
pub async fn signout(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    state.user_service.signout(&auth.0).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Signed out successfully"
    })))
}

#[get("/auth/github/callback")]
pub async fn github_callback(
    state: web::Data<Arc<AppState>>,
    web::Query(params): web::Query<CallbackParams>,
) -> Result<HttpResponse, AppError> {
    let redirect_uri = params
        .redirect_uri
        .as_deref()
        .unwrap_or(DEFAULT_REDIRECT_URI);

    let response = state
        .oauth_service
        .complete_login(&params.code, redirect_uri)
        .await?;

    Ok(HttpResponse::Ok().json(response))
}
