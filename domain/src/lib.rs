//! Business layer for the chat relay: channel catalog, per-channel user
//! presence, message construction, and the domain event plumbing that lets
//! the transport layer react to state changes without the business layer
//! depending on it.

use chrono::{SecondsFormat, Utc};

pub mod channel;
pub mod error;
pub mod events;
pub mod message;
pub mod presence;

pub use channel::{Channel, ChannelDirectory};
pub use error::Error;
pub use events::{DomainEvent, EventHandler, EventPublisher};
pub use message::Message;
pub use presence::{PresenceTracker, User};

/// Channel that always exists and is never deleted, even when empty.
pub const DEFAULT_CHANNEL_ID: &str = "general";

/// Current time as an ISO-8601 string with millisecond precision,
/// e.g. `2026-08-25T09:30:00.123Z`. All timestamps on the wire use this form.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
