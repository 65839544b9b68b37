//! Domain entities - the core business objects.

mod event;
mod page;
pub mod policy;
mod post;
mod user;
mod validation;

pub use event::{DomainEvent, PostCreated};
pub use page::{Page, PageRequest};
pub use policy::PostAction;
pub use post::{Author, Post, PostInput, PostWithAuthor, TITLE_MAX_CHARS};
pub use user::{Registration, User};
pub use validation::{ValidationErrors, not_blank};
