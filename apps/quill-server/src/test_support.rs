//! Fixtures shared by the HTTP handler tests.

use std::time::Duration;

use actix_web::cookie::Cookie;
use uuid::Uuid;

use quill_core::domain::{Post, PostInput, User};
use quill_infra::{JwtConfig, RateLimitConfig};

use crate::config::{AppConfig, SessionConfig};
use crate::middleware::auth::SESSION_COOKIE;
use crate::state::AppState;

/// Password of every seeded user.
pub const PASSWORD: &str = "correct-horse";

pub struct TestUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub token: String,
}

impl TestUser {
    pub fn session_cookie(&self) -> Cookie<'static> {
        Cookie::new(SESSION_COOKIE, self.token.clone())
    }

    pub fn bearer(&self) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", self.token))
    }
}

/// In-memory application with two registered users.
pub struct TestApp {
    pub state: AppState,
    pub alice: TestUser,
    pub bob: TestUser,
}

impl TestApp {
    pub async fn new() -> Self {
        let state = AppState::in_memory(&test_config()).unwrap();
        let alice = seed_user(&state, "Alice", "alice@example.com").await;
        let bob = seed_user(&state, "Bob", "bob@example.com").await;
        Self { state, alice, bob }
    }

    pub async fn post_by(&self, user: &TestUser, title: &str, body: &str) -> Post {
        self.state
            .posts
            .create(user.id, PostInput::new(title, body))
            .await
            .unwrap()
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        #[cfg(feature = "postgres")]
        database: None,
        jwt: JwtConfig {
            secret: "test-secret".to_string(),
            ..JwtConfig::default()
        },
        session: SessionConfig {
            secure_cookie: false,
        },
        auth_rate_limit: RateLimitConfig {
            max_requests: 1000,
            window: Duration::from_secs(60),
        },
    }
}

async fn seed_user(state: &AppState, name: &str, email: &str) -> TestUser {
    let hash = state.passwords.hash(PASSWORD).unwrap();
    let user = state
        .users
        .insert(User::new(name.to_string(), email.to_string(), hash))
        .await
        .unwrap();
    let token = state
        .tokens
        .generate_token(user.id, &user.name, &user.email)
        .unwrap();

    TestUser {
        id: user.id,
        name: user.name,
        email: user.email,
        token,
    }
}

/// Initialise the full route table over `state` as a test service.
macro_rules! test_app {
    ($state:expr) => {{
        let state: $crate::state::AppState = $state;
        let limiter = state.auth_limiter.clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap($crate::middleware::error_pages())
                .app_data(actix_web::web::Data::new(state))
                .configure(move |cfg| $crate::handlers::configure_routes(cfg, limiter)),
        )
        .await
    }};
}

pub(crate) use test_app;

/// Response body as UTF-8 text.
pub async fn read_text<B: actix_web::body::MessageBody>(
    resp: actix_web::dev::ServiceResponse<B>,
) -> String {
    String::from_utf8(actix_web::test::read_body(resp).await.to_vec()).unwrap()
}
