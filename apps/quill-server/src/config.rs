//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

#[cfg(feature = "postgres")]
use quill_infra::database::DatabaseConfig;
use quill_infra::{JwtConfig, RateLimitConfig};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    #[cfg(feature = "postgres")]
    pub database: Option<DatabaseConfig>,
    pub jwt: JwtConfig,
    pub session: SessionConfig,
    pub auth_rate_limit: RateLimitConfig,
}

/// Session cookie settings for browser logins.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Mark the cookie `Secure` (set when serving over HTTPS).
    pub secure_cookie: bool,
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn flag_env(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        #[cfg(feature = "postgres")]
        let database = env::var("DATABASE_URL").ok().map(|url| DatabaseConfig {
            url,
            max_connections: parse_env("DB_MAX_CONNECTIONS", 20),
            min_connections: parse_env("DB_MIN_CONNECTIONS", 2),
        });

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_env("PORT", 8080),
            #[cfg(feature = "postgres")]
            database,
            jwt: JwtConfig::from_env(),
            session: SessionConfig {
                secure_cookie: flag_env("SESSION_COOKIE_SECURE", false),
            },
            auth_rate_limit: RateLimitConfig {
                max_requests: parse_env("AUTH_RATE_LIMIT_MAX_REQUESTS", 10),
                window: Duration::from_secs(parse_env("AUTH_RATE_LIMIT_WINDOW_SECS", 60)),
            },
        }
    }
}
