//! Middleware and request extractors.

pub mod auth;
pub mod error;
pub mod error_pages;
pub mod format;
pub mod rate_limit;

pub use auth::{Identity, OptionalIdentity};
pub use error::{AppError, AppResult};
pub use error_pages::error_pages;
pub use format::ResponseFormat;
pub use rate_limit::RateLimitMiddleware;
