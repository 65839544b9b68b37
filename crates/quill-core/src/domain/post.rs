use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::validation::{ValidationErrors, not_blank};

/// Longest title accepted, matching the `posts.title` column.
pub const TITLE_MAX_CHARS: usize = 255;

/// Post entity - a blog post owned by the user who wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post owned by `user_id`.
    pub fn new(user_id: Uuid, title: String, body: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            body,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the editable fields and bump `updated_at`.
    ///
    /// `updated_at` never moves backwards, even if the wall clock does.
    pub fn revise(&mut self, input: PostInput) {
        self.title = input.title;
        self.body = input.body;
        self.updated_at = Utc::now().max(self.updated_at);
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

/// Title and body as submitted by a client, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PostInput {
    #[validate(custom(function = "not_blank", message = "The title field is required."))]
    #[validate(length(
        max = 255,
        message = "The title may not be greater than 255 characters."
    ))]
    pub title: String,
    #[validate(custom(function = "not_blank", message = "The body field is required."))]
    pub body: String,
}

impl PostInput {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Trim both fields, then check them.
    pub fn validated(self) -> Result<PostInput, ValidationErrors> {
        let input = PostInput::new(self.title.trim(), self.body.trim());
        input.validate()?;
        Ok(input)
    }
}

/// Public view of a post's owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub name: String,
}

/// A post together with its eagerly loaded owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostWithAuthor {
    pub post: Post,
    pub author: Author,
}
