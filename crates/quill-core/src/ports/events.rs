//! Event dispatch port - decouples notifications from persistence.

use async_trait::async_trait;

use crate::domain::DomainEvent;

/// Delivers domain events to whatever listens for them.
#[async_trait]
pub trait EventDispatcher: Send + Sync {
    async fn dispatch(&self, event: DomainEvent) -> Result<(), EventError>;
}

/// Event dispatch errors.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Failed to dispatch {event}: {reason}")]
    Dispatch { event: &'static str, reason: String },
}
