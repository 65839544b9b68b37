//! Account handlers for API clients, plus the credential checks shared
//! with the browser login forms.

use actix_web::{HttpResponse, web};

use quill_core::domain::{Registration, User, ValidationErrors};
use quill_core::error::RepoError;
use quill_shared::dto::{AuthResponse, LoginRequest, RegisterUserRequest, UserResponse};

use crate::middleware::{AppError, AppResult, Identity};
use crate::state::AppState;

/// Message shown for any failed login, whichever half was wrong.
pub(super) const BAD_CREDENTIALS: &str = "These credentials do not match our records.";

/// Validate a registration and store the new user.
///
/// A taken email is reported as a field error, like any other invalid input.
pub(super) async fn register_user(state: &AppState, req: RegisterUserRequest) -> AppResult<User> {
    let Registration {
        name,
        email,
        password,
    } = Registration::new(&req.name, &req.email, req.password)
        .validated()
        .map_err(AppError::Validation)?;

    if state.users.find_by_email(&email).await?.is_some() {
        return Err(email_taken());
    }

    let password_hash = state.passwords.hash(&password)?;
    let user = state
        .users
        .insert(User::new(name, email, password_hash))
        .await
        .map_err(|e| match e {
            // Lost a race with a concurrent registration
            RepoError::Constraint(_) => email_taken(),
            other => other.into(),
        })?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok(user)
}

fn email_taken() -> AppError {
    let mut errors = ValidationErrors::new();
    errors.add("email", "The email has already been taken.");
    AppError::Validation(errors)
}

/// Look up a user by email and check the password.
pub(super) async fn authenticate(state: &AppState, email: &str, password: &str) -> AppResult<User> {
    let email = email.trim().to_lowercase();
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !state.passwords.verify(password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Password mismatch");
        return Err(AppError::Unauthorized);
    }

    Ok(user)
}

/// Issue a session token for `user`.
pub(super) fn issue_token(state: &AppState, user: &User) -> AppResult<String> {
    Ok(state
        .tokens
        .generate_token(user.id, &user.name, &user.email)?)
}

fn token_response(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    Ok(AuthResponse {
        access_token: issue_token(state, user)?,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.expiration_seconds().max(0) as u64,
    })
}

/// POST /api/auth/register
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterUserRequest>,
) -> AppResult<HttpResponse> {
    let user = register_user(&state, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(token_response(&state, &user)?))
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let user = authenticate(&state, &req.email, &req.password).await?;
    Ok(HttpResponse::Ok().json(token_response(&state, &user)?))
}

/// GET /api/auth/me - Protected route
pub async fn me(identity: Identity) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(UserResponse {
        id: identity.user_id.to_string(),
        name: identity.name,
        email: identity.email,
    }))
}
