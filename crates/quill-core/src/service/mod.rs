//! Application services - use cases composed from domain types and ports.

mod posts;

pub use posts::{POSTS_PER_PAGE, PostService};
