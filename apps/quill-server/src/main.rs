//! # Quill Server
//!
//! Blog posts as server-rendered pages and a JSON API, on Actix-web.

use actix_web::{App, HttpServer, web};
use anyhow::Context;
use tracing_actix_web::TracingLogger;

mod config;
mod handlers;
mod listeners;
mod middleware;
mod observability;
mod state;
mod telemetry;
mod templates;

#[cfg(test)]
mod test_support;

use config::AppConfig;
use observability::RequestIdMiddleware;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();

    tracing::info!(
        "Starting Quill server on {}:{}",
        config.host,
        config.port
    );

    let state = AppState::new(&config)
        .await
        .context("failed to build application state")?;

    let _listener = listeners::spawn_post_listener(state.events.subscribe());

    HttpServer::new(move || {
        let auth_limiter = state.auth_limiter.clone();
        App::new()
            .wrap(middleware::error_pages())
            .wrap(RequestIdMiddleware)
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(move |cfg| handlers::configure_routes(cfg, auth_limiter))
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?
    .run()
    .await?;

    Ok(())
}
