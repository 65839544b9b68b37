use std::sync::Arc;

use uuid::Uuid;

use crate::domain::policy::{self, PostAction};
use crate::domain::{DomainEvent, Page, PageRequest, Post, PostInput, PostWithAuthor};
use crate::error::{DomainError, RepoError};
use crate::ports::{BaseRepository, EventDispatcher, PostRepository};

/// Number of posts shown per listing page.
pub const POSTS_PER_PAGE: u64 = 3;

/// Post use cases: listing, creation, display, editing and deletion.
///
/// Every per-post operation starts by loading the post (failing with
/// `NotFound`), then checks the ownership policy before touching it.
#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    events: Arc<dyn EventDispatcher>,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostRepository>, events: Arc<dyn EventDispatcher>) -> Self {
        Self { posts, events }
    }

    /// Page `page` (1-based) of the listing, owners loaded.
    pub async fn list(&self, page: u64) -> Result<Page<PostWithAuthor>, DomainError> {
        let request = PageRequest::new(page, POSTS_PER_PAGE);
        Ok(self.posts.paginate_with_authors(request).await?)
    }

    /// Validate and persist a post owned by `owner`, then announce it.
    pub async fn create(&self, owner: Uuid, input: PostInput) -> Result<Post, DomainError> {
        let input = input.validated().map_err(DomainError::Validation)?;
        let post = self
            .posts
            .insert(Post::new(owner, input.title, input.body))
            .await?;

        tracing::info!(post_id = %post.id, user_id = %owner, "Post created");

        let event = DomainEvent::PostCreated((&post).into());
        if let Err(e) = self.events.dispatch(event).await {
            tracing::warn!(post_id = %post.id, error = %e, "Post created but event dispatch failed");
        }

        Ok(post)
    }

    /// Load a post and its owner for display.
    pub async fn show(&self, id: Uuid) -> Result<PostWithAuthor, DomainError> {
        self.posts
            .find_with_author(id)
            .await?
            .ok_or_else(|| DomainError::post_not_found(id))
    }

    /// Load a post for its edit form; only the owner may open it.
    pub async fn edit(&self, actor: Uuid, id: Uuid) -> Result<Post, DomainError> {
        self.load_authorized(actor, id, PostAction::Update).await
    }

    /// Replace title and body of a post owned by `actor`.
    pub async fn update(
        &self,
        actor: Uuid,
        id: Uuid,
        input: PostInput,
    ) -> Result<Post, DomainError> {
        let mut post = self.load_authorized(actor, id, PostAction::Update).await?;
        let input = input.validated().map_err(DomainError::Validation)?;
        post.revise(input);

        let post = self.posts.update(post).await.map_err(|e| match e {
            RepoError::NotFound => DomainError::post_not_found(id),
            other => other.into(),
        })?;

        tracing::info!(post_id = %id, user_id = %actor, "Post updated");
        Ok(post)
    }

    /// Permanently delete a post owned by `actor`.
    pub async fn destroy(&self, actor: Uuid, id: Uuid) -> Result<(), DomainError> {
        self.load_authorized(actor, id, PostAction::Delete).await?;

        self.posts.delete(id).await.map_err(|e| match e {
            RepoError::NotFound => DomainError::post_not_found(id),
            other => other.into(),
        })?;

        tracing::info!(post_id = %id, user_id = %actor, "Post deleted");
        Ok(())
    }

    async fn load_authorized(
        &self,
        actor: Uuid,
        id: Uuid,
        action: PostAction,
    ) -> Result<Post, DomainError> {
        let post = self
            .posts
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::post_not_found(id))?;

        if !policy::can(action, &post, Some(actor)) {
            tracing::debug!(post_id = %id, user_id = %actor, ?action, "Post action denied");
            return Err(DomainError::Forbidden);
        }

        Ok(post)
    }
}
