//! In-process event bus on a tokio broadcast channel.
//!
//! Works within a single process only.

use async_trait::async_trait;
use tokio::sync::broadcast;

use quill_core::domain::DomainEvent;
use quill_core::ports::{EventDispatcher, EventError};

/// Fan-out event bus: every subscriber sees every event dispatched after it subscribed.
#[derive(Clone)]
pub struct InMemoryEventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl InMemoryEventBus {
    pub fn new(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl EventDispatcher for InMemoryEventBus {
    async fn dispatch(&self, event: DomainEvent) -> Result<(), EventError> {
        let name = event.name();
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::debug!(event = name, receivers, "Event dispatched");
            }
            Err(_) => {
                // No listeners is not a failure for the producer.
                tracing::debug!(event = name, "No listeners for event");
            }
        }
        Ok(())
    }
}
