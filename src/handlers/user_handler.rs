use std::sync::Arc;

use actix_web::{delete, get, patch, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::{require_role, require_self_or_admin, AuthenticatedUser},
    errors::AppError,
    models::{domain::UserRole, dto::request::ChangePasswordRequest},
};

#[get("/users/{userid}")]
pub async fn get_user(
    state: web::Data<Arc<AppState>>,
    userid: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_self_or_admin(&auth.0, &userid)?;

    let user = state.user_service.get_user(&userid).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[patch("/users/{userid}/password")]
pub async fn change_password(
    state: web::Data<Arc<AppState>>,
    userid: web::Path<String>,
    request: web::Json<ChangePasswordRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_self_or_admin(&auth.0, &userid)?;

    state
        .user_service
        .change_password(&userid, request.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Password changed"
    })))
}

#[post("/users/{userid}/roles/{role}")]
pub async fn add_role(
    state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.0, UserRole::Admin)?;

    let (userid, role) = path.into_inner();
    state.user_service.add_role(&userid, &role).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Role added"
    })))
}

#[delete("/users/{userid}/roles/{role}")]
pub async fn remove_role(
    state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_role(&auth.0, UserRole::Admin)?;

    let (userid, role) = path.into_inner();
    state.user_service.remove_role(&userid, &role).await?;

    Ok(HttpResponse::NoContent().finish())
}

#[get("/health")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[get("/health/live")]
pub async fn health_check_live() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
