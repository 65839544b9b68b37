//! Background listeners for domain events.

use tokio::sync::broadcast::{Receiver, error::RecvError};
use tokio::task::JoinHandle;

use quill_core::domain::{DomainEvent, PostCreated};

/// What gets announced when a post goes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub subject: String,
    pub link: String,
}

impl From<&PostCreated> for Announcement {
    fn from(created: &PostCreated) -> Self {
        Self {
            subject: format!("New post: {}", created.title),
            link: format!("/posts/{}", created.post_id),
        }
    }
}

/// Consume domain events until the bus closes.
pub fn spawn_post_listener(mut events: Receiver<DomainEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(DomainEvent::PostCreated(created)) => {
                    let announcement = Announcement::from(&created);
                    tracing::info!(
                        post_id = %created.post_id,
                        user_id = %created.user_id,
                        subject = %announcement.subject,
                        link = %announcement.link,
                        "Announcing new post"
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Post listener fell behind; events dropped");
                }
                Err(RecvError::Closed) => {
                    tracing::debug!("Event bus closed; post listener stopping");
                    break;
                }
            }
        }
    })
}
