use std::{sync::Arc, time::Duration};

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use chrono::Utc;

use quizcraft_server::{
    app_state::AppState, config::Config, handlers, middleware::RequestIdMiddleware,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    if matches!(std::env::var("APP_ENV").as_deref(), Ok("production")) {
        config.validate_for_production();
    }

    let state = Arc::new(
        AppState::new(config.clone())
            .await
            .expect("failed to initialize application state"),
    );

    // Revocation entries outlive their usefulness once the token they shadow
    // has expired; sweep them on a timer (first tick fires at startup).
    {
        let revoked_tokens = state.revoked_tokens.clone();
        let sweep_interval = Duration::from_secs(config.token_sweep_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            loop {
                interval.tick().await;
                match revoked_tokens.delete_expired(Utc::now()).await {
                    Ok(0) => {}
                    Ok(count) => log::info!("Swept {} expired revocation entries", count),
                    Err(err) => log::warn!("Revocation sweep failed: {}", err),
                }
            }
        });
    }

    log::info!(
        "Starting HTTP server on {}:{}",
        config.web_server_host,
        config.web_server_port
    );

    let bind_addr = (config.web_server_host.clone(), config.web_server_port);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(state.access_guard.clone()))
            .wrap(Logger::default())
            .wrap(RequestIdMiddleware)
            .wrap(Cors::permissive())
            .configure(handlers::configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
