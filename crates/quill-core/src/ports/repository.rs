use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Page, PageRequest, Post, PostWithAuthor, User};
use crate::error::RepoError;

/// Generic repository trait shared by every entity store.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Delete an entity by its ID. Fails with `RepoError::NotFound` if nothing was removed.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// Persist a new user. Fails with `RepoError::Constraint` if the email is taken.
    async fn insert(&self, user: User) -> Result<User, RepoError>;
}

/// Post repository.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    /// Persist a new post.
    async fn insert(&self, post: Post) -> Result<Post, RepoError>;

    /// Write back title, body and `updated_at` of an existing post.
    async fn update(&self, post: Post) -> Result<Post, RepoError>;

    /// Load a post together with its owner.
    async fn find_with_author(&self, id: Uuid) -> Result<Option<PostWithAuthor>, RepoError>;

    /// One page of posts in insertion order, owners loaded alongside.
    async fn paginate_with_authors(
        &self,
        request: PageRequest,
    ) -> Result<Page<PostWithAuthor>, RepoError>;
}
