//! In-memory repositories - used when no database is configured.
//!
//! Data is lost on process restart. Posts keep insertion order, which is
//! the order the listing uses.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::{Page, PageRequest, Post, PostWithAuthor, User};
use quill_core::error::RepoError;
use quill_core::ports::{BaseRepository, PostRepository, UserRepository};

/// In-memory user store keyed by id.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.users
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, user: User) -> Result<User, RepoError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

/// In-memory post store.
///
/// Owners are resolved against the shared user repository, mirroring the
/// join the database performs.
pub struct InMemoryPostRepository {
    posts: RwLock<Vec<Post>>,
    users: Arc<InMemoryUserRepository>,
}

impl InMemoryPostRepository {
    pub fn new(users: Arc<InMemoryUserRepository>) -> Self {
        Self {
            posts: RwLock::new(Vec::new()),
            users,
        }
    }

    async fn attach_author(&self, post: Post) -> Result<PostWithAuthor, RepoError> {
        let owner = self.users.find_by_id(post.user_id).await?.ok_or_else(|| {
            RepoError::Constraint(format!("post {} has no owner row", post.id))
        })?;

        Ok(PostWithAuthor {
            author: owner.as_author(),
            post,
        })
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let posts = self.posts.read().await;
        Ok(posts.iter().find(|p| p.id == id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut posts = self.posts.write().await;
        let index = posts
            .iter()
            .position(|p| p.id == id)
            .ok_or(RepoError::NotFound)?;
        posts.remove(index);
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        if self.users.find_by_id(post.user_id).await?.is_none() {
            return Err(RepoError::Constraint(format!(
                "user {} does not exist",
                post.user_id
            )));
        }

        let mut posts = self.posts.write().await;
        if posts.iter().any(|p| p.id == post.id) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        posts.push(post.clone());
        Ok(post)
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let mut posts = self.posts.write().await;
        let stored = posts
            .iter_mut()
            .find(|p| p.id == post.id)
            .ok_or(RepoError::NotFound)?;

        stored.title = post.title;
        stored.body = post.body;
        stored.updated_at = post.updated_at;
        Ok(stored.clone())
    }

    async fn find_with_author(&self, id: Uuid) -> Result<Option<PostWithAuthor>, RepoError> {
        match self.find_by_id(id).await? {
            Some(post) => self.attach_author(post).await.map(Some),
            None => Ok(None),
        }
    }

    async fn paginate_with_authors(
        &self,
        request: PageRequest,
    ) -> Result<Page<PostWithAuthor>, RepoError> {
        let (slice, total_items) = {
            let posts = self.posts.read().await;
            let slice: Vec<Post> = posts
                .iter()
                .skip(usize::try_from(request.offset()).unwrap_or(usize::MAX))
                .take(usize::try_from(request.per_page).unwrap_or(usize::MAX))
                .cloned()
                .collect();
            (slice, posts.len() as u64)
        };

        let mut items = Vec::with_capacity(slice.len());
        for post in slice {
            items.push(self.attach_author(post).await?);
        }

        Ok(Page::new(items, request, total_items))
    }
}
