//! Event system that decouples domain logic from transport concerns
//! (like SSE fan-out).
//!
//! - **DomainEvent**: closed enum of every business event in the system
//! - **EventHandler**: trait for implementing event handlers
//! - **EventPublisher**: publishes events to registered handlers
//!
//! The variants carry typed domain models rather than loose JSON so that a
//! handler cannot observe a payload shape the compiler does not know about.

use crate::{Channel, Message, User};
use async_trait::async_trait;
use std::sync::Arc;

/// Business-level changes, emitted after the owning structure has already
/// been mutated. Channel list changes are of interest to every connection;
/// the user/message events only to subscribers of `channel_id`.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    ChannelCreated {
        channel: Channel,
    },
    ChannelUpdated {
        channel: Channel,
    },
    ChannelDeleted {
        channel: Channel,
    },
    UserJoined {
        channel_id: String,
        user: User,
    },
    UserLeft {
        channel_id: String,
        user: User,
    },
    /// A chat message accepted for broadcast. Messages are never stored;
    /// this event is the only place one exists after the HTTP request ends.
    MessagePosted {
        channel_id: String,
        message: Message,
    },
}

/// Trait for handling domain events.
/// Implementations perform side effects like fanning events out to live
/// connections, updating caches, logging, etc.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

/// Publishes domain events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    /// Store the returned publisher in your application state.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Publish an event to all registered handlers, sequentially.
    pub async fn publish(&self, event: DomainEvent) {
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
