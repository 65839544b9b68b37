use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::post::Post;

/// Events emitted by domain operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    PostCreated(PostCreated),
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::PostCreated(_) => "post_created",
        }
    }
}

/// Fired once a new post has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCreated {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Post> for PostCreated {
    fn from(post: &Post) -> Self {
        Self {
            post_id: post.id,
            user_id: post.user_id,
            title: post.title.clone(),
            created_at: post.created_at,
        }
    }
}
