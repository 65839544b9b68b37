//! Authentication extractors and the browser session cookie.

use actix_web::cookie::{Cookie, SameSite, time::Duration as CookieDuration};
use actix_web::{FromRequest, HttpRequest, HttpResponse, dev::Payload, http::header, web};
use serde::Serialize;
use std::future::{Ready, ready};
use uuid::Uuid;

use quill_core::ports::{AuthError, TokenClaims};
use quill_shared::ErrorResponse;

use crate::config::SessionConfig;
use crate::middleware::ResponseFormat;
use crate::state::AppState;

/// Name of the cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "quill_session";

/// Authenticated user identity extractor.
///
/// Accepts a `Bearer` token in the `Authorization` header or the session
/// cookie set by the login form:
/// ```ignore
/// async fn protected_route(identity: Identity) -> impl Responder {
///     format!("Hello, {}!", identity.name)
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            name: claims.name,
            email: claims.email,
        }
    }
}

/// Error type for authentication failures.
///
/// Page requests are sent to the login form instead of receiving a 401.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct AuthenticationError {
    error: AuthError,
    login_redirect: Option<String>,
}

impl AuthenticationError {
    fn for_request(req: &HttpRequest, error: AuthError) -> Self {
        let login_redirect = match ResponseFormat::of(req) {
            ResponseFormat::Html => Some(login_url(req)),
            ResponseFormat::Json => None,
        };
        Self {
            error,
            login_redirect,
        }
    }
}

/// `/login?next=<current path>` for the request being rejected.
fn login_url(req: &HttpRequest) -> String {
    let next = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/posts");

    serde_urlencoded::to_string([("next", next)])
        .map(|query| format!("/login?{}", query))
        .unwrap_or_else(|_| "/login".to_string())
}

impl actix_web::ResponseError for AuthenticationError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        if self.login_redirect.is_some() {
            return StatusCode::FOUND;
        }
        match &self.error {
            AuthError::HashingError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let Some(location) = &self.login_redirect {
            return HttpResponse::Found()
                .insert_header((header::LOCATION, location.as_str()))
                .finish();
        }

        let error = match &self.error {
            AuthError::TokenExpired => ErrorResponse::new(401, "Token Expired")
                .with_detail("Your session has expired. Please log in again."),
            AuthError::InvalidToken(msg) => {
                ErrorResponse::new(401, "Invalid Token").with_detail(msg.clone())
            }
            AuthError::MissingAuth => ErrorResponse::new(401, "Authentication Required")
                .with_detail("Log in or provide a valid Bearer token in the Authorization header."),
            AuthError::InvalidCredentials => ErrorResponse::unauthorized(),
            AuthError::HashingError(_) => ErrorResponse::internal_error(),
        };

        HttpResponse::build(self.status_code()).json(error)
    }
}

/// Token from `Authorization: Bearer`, falling back to the session cookie.
fn request_token(req: &HttpRequest) -> Result<String, AuthError> {
    if let Some(value) = req.headers().get(header::AUTHORIZATION) {
        let auth_str = value
            .to_str()
            .map_err(|_| AuthError::InvalidToken("Invalid authorization header".to_string()))?;

        return auth_str
            .strip_prefix("Bearer ")
            .map(str::to_string)
            .ok_or_else(|| AuthError::InvalidToken("Expected Bearer token".to_string()));
    }

    req.cookie(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MissingAuth)
}

impl FromRequest for Identity {
    type Error = AuthenticationError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = match req.app_data::<web::Data<AppState>>() {
            Some(state) => state,
            None => {
                tracing::error!("AppState not found in app data");
                return ready(Err(AuthenticationError::for_request(
                    req,
                    AuthError::InvalidToken("Server configuration error".to_string()),
                )));
            }
        };

        let result = request_token(req)
            .and_then(|token| state.tokens.validate_token(&token))
            .map(Identity::from)
            .map_err(|e| AuthenticationError::for_request(req, e));

        ready(result)
    }
}

/// Optional identity extractor - doesn't fail if not authenticated.
pub struct OptionalIdentity(pub Option<Identity>);

impl OptionalIdentity {
    pub fn user_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|identity| identity.user_id)
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.0.as_ref()
    }
}

impl FromRequest for OptionalIdentity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        match Identity::from_request(req, payload).into_inner() {
            Ok(identity) => ready(Ok(OptionalIdentity(Some(identity)))),
            Err(_) => ready(Ok(OptionalIdentity(None))),
        }
    }
}

/// Identity of the signed-in visitor, if any, outside of handler extraction.
pub fn viewer_of(req: &HttpRequest) -> Option<Identity> {
    Identity::from_request(req, &mut Payload::None).into_inner().ok()
}

/// Session cookie carrying a freshly issued token.
pub fn session_cookie(token: String, config: &SessionConfig, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookie)
        .max_age(CookieDuration::seconds(max_age_secs))
        .finish()
}

/// Cookie that clears the session on the client.
pub fn expired_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish();
    cookie.make_removal();
    cookie
}
