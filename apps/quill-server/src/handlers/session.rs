//! Browser sign-in: login and registration forms and the session cookie.

use actix_web::{
    HttpResponse,
    http::{StatusCode, header},
    web,
};
use serde::{Deserialize, Serialize};

use quill_core::domain::{User, ValidationErrors};
use quill_shared::dto::{LoginRequest, RegisterUserRequest};

use super::auth::{BAD_CREDENTIALS, authenticate, issue_token, register_user};
use crate::middleware::auth::{expired_session_cookie, session_cookie};
use crate::middleware::{AppError, AppResult, OptionalIdentity};
use crate::state::AppState;
use crate::templates::page_context;

const DEFAULT_LANDING: &str = "/posts";

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    next: Option<String>,
}

/// Values echoed back into a re-rendered form. Passwords never are.
#[derive(Debug, Default, Serialize)]
struct FormValues {
    name: String,
    email: String,
}

/// Only same-site paths are followed after login.
///
/// Browsers drop tabs and newlines while parsing a URL, so `/\t/host`
/// would become `//host`. Any whitespace or control character is refused.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if is_local_path(path) => path,
        _ => DEFAULT_LANDING,
    }
}

fn is_local_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.chars().any(|c| c.is_control() || c.is_whitespace())
}

/// Respond with a redirect that also installs a session for `user`.
fn signed_in(state: &AppState, user: &User, location: &str) -> AppResult<HttpResponse> {
    let token = issue_token(state, user)?;
    let cookie = session_cookie(token, &state.session, state.tokens.expiration_seconds());

    tracing::info!(user_id = %user.id, "Session started");
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .cookie(cookie)
        .finish())
}

fn render_login(
    state: &AppState,
    next: &str,
    form: &FormValues,
    errors: &ValidationErrors,
    status: StatusCode,
) -> AppResult<HttpResponse> {
    let mut context = page_context(None);
    context.insert("next", next);
    context.insert("form", form);
    context.insert("errors", errors);
    state.templates.page(status, "auth/login.html", &context)
}

fn render_register(
    state: &AppState,
    form: &FormValues,
    errors: &ValidationErrors,
    status: StatusCode,
) -> AppResult<HttpResponse> {
    let mut context = page_context(None);
    context.insert("form", form);
    context.insert("errors", errors);
    state.templates.page(status, "auth/register.html", &context)
}

/// GET /login
pub async fn login_form(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    query: web::Query<NextQuery>,
) -> AppResult<HttpResponse> {
    let next = safe_next(query.next.as_deref());
    if viewer.identity().is_some() {
        return Ok(HttpResponse::Found()
            .insert_header((header::LOCATION, next))
            .finish());
    }

    render_login(
        &state,
        next,
        &FormValues::default(),
        &ValidationErrors::new(),
        StatusCode::OK,
    )
}

/// POST /login
pub async fn login(
    state: web::Data<AppState>,
    form: web::Form<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = form.into_inner();
    let next = safe_next(req.next.as_deref());

    match authenticate(&state, &req.email, &req.password).await {
        Ok(user) => signed_in(&state, &user, next),
        Err(AppError::Unauthorized) => {
            let mut errors = ValidationErrors::new();
            errors.add("email", BAD_CREDENTIALS);
            let values = FormValues {
                email: req.email,
                ..FormValues::default()
            };
            render_login(
                &state,
                next,
                &values,
                &errors,
                StatusCode::UNPROCESSABLE_ENTITY,
            )
        }
        Err(e) => Err(e),
    }
}

/// GET /register
pub async fn register_form(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    render_register(
        &state,
        &FormValues::default(),
        &ValidationErrors::new(),
        StatusCode::OK,
    )
}

/// POST /register
pub async fn register(
    state: web::Data<AppState>,
    form: web::Form<RegisterUserRequest>,
) -> AppResult<HttpResponse> {
    let req = form.into_inner();
    let values = FormValues {
        name: req.name.clone(),
        email: req.email.clone(),
    };

    match register_user(&state, req).await {
        Ok(user) => signed_in(&state, &user, DEFAULT_LANDING),
        Err(AppError::Validation(errors)) => render_register(
            &state,
            &values,
            &errors,
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        Err(e) => Err(e),
    }
}

/// POST /logout
pub async fn logout() -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, DEFAULT_LANDING))
        .cookie(expired_session_cookie())
        .finish()
}
