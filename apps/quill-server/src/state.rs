//! Application state - shared across all handlers.

use std::sync::Arc;

use quill_core::PostService;
use quill_core::ports::{PasswordService, PostRepository, RateLimiter, TokenService, UserRepository};
use quill_infra::{
    Argon2PasswordService, InMemoryEventBus, InMemoryPostRepository, InMemoryRateLimiter,
    InMemoryUserRepository, JwtTokenService,
};

#[cfg(feature = "postgres")]
use quill_infra::database::{PostgresPostRepository, PostgresUserRepository, connect};

use crate::config::{AppConfig, SessionConfig};
use crate::templates::Templates;

/// Where posts and users are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Postgres,
    Memory,
}

impl Storage {
    pub fn as_str(self) -> &'static str {
        match self {
            Storage::Postgres => "postgres",
            Storage::Memory => "memory",
        }
    }
}

struct Repositories {
    users: Arc<dyn UserRepository>,
    posts: Arc<dyn PostRepository>,
    storage: Storage,
}

impl Repositories {
    fn in_memory() -> Self {
        let users = Arc::new(InMemoryUserRepository::new());
        let posts: Arc<dyn PostRepository> = Arc::new(InMemoryPostRepository::new(users.clone()));
        Self {
            users,
            posts,
            storage: Storage::Memory,
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub posts: PostService,
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    pub events: InMemoryEventBus,
    pub auth_limiter: Arc<dyn RateLimiter>,
    pub templates: Arc<Templates>,
    pub session: SessionConfig,
    pub storage: Storage,
}

impl AppState {
    /// Build the application state, connecting to Postgres when configured.
    pub async fn new(config: &AppConfig) -> Result<Self, tera::Error> {
        let repositories = Self::repositories(config).await;
        let state = Self::assemble(config, repositories)?;
        tracing::info!(storage = state.storage.as_str(), "Application state initialized");
        Ok(state)
    }

    /// State backed entirely by in-process stores.
    pub fn in_memory(config: &AppConfig) -> Result<Self, tera::Error> {
        Self::assemble(config, Repositories::in_memory())
    }

    fn assemble(config: &AppConfig, repositories: Repositories) -> Result<Self, tera::Error> {
        let events = InMemoryEventBus::default();
        let posts = PostService::new(repositories.posts, Arc::new(events.clone()));

        Ok(Self {
            posts,
            users: repositories.users,
            tokens: Arc::new(JwtTokenService::new(config.jwt.clone())),
            passwords: Arc::new(Argon2PasswordService::new()),
            events,
            auth_limiter: Arc::new(InMemoryRateLimiter::new(config.auth_rate_limit.clone())),
            templates: Arc::new(Templates::load()?),
            session: config.session.clone(),
            storage: repositories.storage,
        })
    }

    #[cfg(feature = "postgres")]
    async fn repositories(config: &AppConfig) -> Repositories {
        let Some(db_config) = &config.database else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return Repositories::in_memory();
        };

        match connect(db_config).await {
            Ok(conn) => {
                let conn = Arc::new(conn);
                Repositories {
                    users: Arc::new(PostgresUserRepository::shared(conn.clone())),
                    posts: Arc::new(PostgresPostRepository::shared(conn)),
                    storage: Storage::Postgres,
                }
            }
            Err(e) => {
                tracing::error!(
                    "Failed to connect to database: {}. Using in-memory fallback.",
                    e
                );
                Repositories::in_memory()
            }
        }
    }

    #[cfg(not(feature = "postgres"))]
    async fn repositories(_config: &AppConfig) -> Repositories {
        tracing::info!("Running without postgres feature - using in-memory repositories");
        Repositories::in_memory()
    }
}
