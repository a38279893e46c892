//! Server-Sent Events (SSE) transport for the chat relay.
//!
//! This crate turns domain events into `data: <JSON>\n\n` frames and fans
//! them out to live channel subscribers.
//!
//! # Architecture
//!
//! - **Dual-index registry**: O(1) lookups for both connection cleanup and
//!   channel-scoped broadcast routing via separate DashMap indices.
//! - **Serialize once**: each broadcast encodes the event a single time and
//!   shares the frame bytes across every recipient.
//! - **Failure isolation**: a connection whose write fails is evicted on the
//!   spot; the other subscribers always get the event.
//! - **Ephemeral events**: nothing is buffered or replayed. A client that is
//!   offline misses the event and resyncs from the `connect` snapshot on its
//!   next subscribe.
//! - **Sessions own lifecycle**: every subscriber is a
//!   [`session::ChannelStreamSession`] that registers itself, announces the
//!   join, streams, pings, and tears everything down when the client goes
//!   away.
//!
//! # Event Flow
//!
//! 1. A client subscribes; the HTTP layer opens a `ChannelStreamSession`
//! 2. The session registers the connection, joins presence, and pushes the
//!    `connect` snapshot directly to the new subscriber
//! 3. Domain operations publish [`domain::DomainEvent`]s
//! 4. [`domain_event_handler::ChannelEventHandler`] converts each one into a
//!    wire [`message::ChannelEvent`] and picks its scope: channel-list
//!    changes go to every connection, messages and presence changes only to
//!    the affected channel
//! 5. [`broadcaster::EventBroadcaster`] serializes the event once and writes
//!    it to the snapshot of matching sinks, evicting any that fail
//!
//! # Modules
//!
//! - `connection`: ConnectionRegistry with dual-index architecture, the
//!   `EventSink` transport capability, and type-safe ConnectionId
//! - `broadcaster`: serialize-once fan-out with per-connection eviction
//! - `session`: per-subscriber lifecycle state machine with keep-alive
//! - `message`: wire-level event union and SSE framing
//! - `domain_event_handler`: domain event -> wire event routing

pub mod broadcaster;
pub mod connection;
pub mod domain_event_handler;
pub mod message;
pub mod session;

pub use broadcaster::EventBroadcaster;
pub use connection::{ChannelSink, ConnectionId, ConnectionRegistry, EventSink, WriteError};
pub use domain_event_handler::ChannelEventHandler;
pub use message::{ChannelEvent, Frame};
pub use session::{ChannelStreamSession, SessionContext, SessionState};
