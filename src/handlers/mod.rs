use actix_web::web;

use crate::auth::AuthMiddleware;

pub mod auth_handler;
pub mod quiz_handler;
pub mod user_handler;

/// Route table, shared between `main` and the HTTP-level tests. Everything
/// under the inner scope sits behind the auth middleware.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(user_handler::health_check)
        .service(user_handler::health_check_live)
        .service(
            web::scope("/api/v1")
                .service(auth_handler::signup)
                .service(auth_handler::signin)
                .service(auth_handler::github_callback)
                .service(
                    web::scope("")
                        .wrap(AuthMiddleware)
                        .service(auth_handler::signout)
                        .service(user_handler::get_user)
                        .service(user_handler::change_password)
                        .service(user_handler::add_role)
                        .service(user_handler::remove_role)
                        .service(quiz_handler::get_quiz),
                ),
        );
}
