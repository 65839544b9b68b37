//! HTTP handlers and route configuration.

mod auth;
mod health;
mod posts;
mod session;

use std::sync::Arc;

use actix_web::web;

use quill_core::ports::RateLimiter;

use crate::middleware::{AppError, RateLimitMiddleware};

/// Configure all application routes.
///
/// Credential endpoints share `auth_limiter`.
pub fn configure_routes(cfg: &mut web::ServiceConfig, auth_limiter: Arc<dyn RateLimiter>) {
    // Malformed bodies answer with problem details like every other error
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::FormConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .route("/", web::get().to(posts::home))
        .service(
            web::scope("/api")
                // Public routes
                .route("/health", web::get().to(health::health_check))
                // Auth routes
                .service(
                    web::scope("/auth")
                        .wrap(RateLimitMiddleware::new(auth_limiter.clone()))
                        .route("/register", web::post().to(auth::register))
                        .route("/login", web::post().to(auth::login))
                        .route("/me", web::get().to(auth::me)),
                ),
        )
        // Browser sessions
        .service(
            web::resource("/login")
                .wrap(RateLimitMiddleware::new(auth_limiter.clone()))
                .route(web::get().to(session::login_form))
                .route(web::post().to(session::login)),
        )
        .service(
            web::resource("/register")
                .wrap(RateLimitMiddleware::new(auth_limiter))
                .route(web::get().to(session::register_form))
                .route(web::post().to(session::register)),
        )
        .route("/logout", web::post().to(session::logout))
        // Posts; `create` is registered before `{id}` so it is not read as an id
        .service(
            web::scope("/posts")
                .service(
                    web::resource("")
                        .route(web::get().to(posts::index))
                        .route(web::post().to(posts::store)),
                )
                .service(web::resource("/create").route(web::get().to(posts::create)))
                .service(
                    web::resource("/{id}")
                        .route(web::get().to(posts::show))
                        .route(web::put().to(posts::update))
                        .route(web::patch().to(posts::update))
                        .route(web::delete().to(posts::destroy))
                        .route(web::post().to(posts::method_override)),
                )
                .service(web::resource("/{id}/edit").route(web::get().to(posts::edit))),
        );
}
