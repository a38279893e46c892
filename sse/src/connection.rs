use crate::message::Frame;
use dashmap::DashMap;
use std::collections::HashSet;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

// Type alias for the registry key (one key per channel)
pub type ChannelKey = String;

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// The connection could not accept a frame; the client is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteError;

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "connection is no longer writable")
    }
}

impl StdError for WriteError {}

/// A connection's outbound half. Anything that can accept serialized frames
/// and report write failure qualifies; the production implementation is
/// [`ChannelSink`], tests substitute in-memory doubles.
pub trait EventSink: Send + Sync {
    fn send(&self, frame: Frame) -> Result<(), WriteError>;
}

/// mpsc-backed sink feeding an HTTP response body. A send fails exactly when
/// the receiving stream has been dropped, i.e. the client disconnected.
pub struct ChannelSink {
    sender: UnboundedSender<Frame>,
}

impl ChannelSink {
    pub fn new() -> (Arc<Self>, UnboundedReceiver<Frame>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Arc::new(Self { sender }), receiver)
    }
}

impl EventSink for ChannelSink {
    fn send(&self, frame: Frame) -> Result<(), WriteError> {
        self.sender.send(frame).map_err(|_| WriteError)
    }
}

/// Connection information (no redundant connection_id)
#[derive(Clone)]
pub struct ConnectionInfo {
    pub channel: ChannelKey,
    pub sink: Arc<dyn EventSink>,
}

/// Connection registry with dual indices for O(1) lookups.
///
/// Pure bookkeeping: registering or removing a connection has no side
/// effects beyond these two maps, and the set of keys tracked here is
/// independent of which channels the directory knows about.
pub struct ConnectionRegistry {
    /// Primary storage: lookup by connection_id for registration/cleanup - O(1)
    connections: DashMap<ConnectionId, ConnectionInfo>,

    /// Secondary index: fast lookup by channel key for broadcast routing - O(1)
    channel_index: DashMap<ChannelKey, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            channel_index: DashMap::new(),
        }
    }

    /// Register a new connection under a channel key - O(1)
    pub fn register(&self, channel: &str, sink: Arc<dyn EventSink>) -> ConnectionId {
        let connection_id = ConnectionId::new();

        // Insert into primary storage
        self.connections.insert(
            connection_id.clone(),
            ConnectionInfo {
                channel: channel.to_string(),
                sink,
            },
        );

        // Update secondary index
        self.channel_index
            .entry(channel.to_string())
            .or_default()
            .insert(connection_id.clone());

        connection_id
    }

    /// Remove a connection - O(1). Unknown ids are a no-op.
    pub fn remove(&self, connection_id: &ConnectionId) {
        // Remove from primary storage
        if let Some((_, info)) = self.connections.remove(connection_id) {
            let channel = info.channel;

            // Update secondary index
            if let Some(mut entry) = self.channel_index.get_mut(&channel) {
                entry.remove(connection_id);

                // Clean up empty channel entries
                if entry.is_empty() {
                    drop(entry); // Release lock before removal
                    self.channel_index.remove(&channel);
                }
            }
        }
    }

    /// Number of live connections under one channel key.
    pub fn count_for(&self, channel: &str) -> usize {
        self.channel_index
            .get(channel)
            .map(|entry| entry.len())
            .unwrap_or(0)
    }

    /// Number of live connections across all channels.
    pub fn total_count(&self) -> usize {
        self.connections.len()
    }

    /// Snapshot of every channel key with at least one connection.
    pub fn all_keys(&self) -> Vec<ChannelKey> {
        self.channel_index
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Snapshot of the sinks under one channel key. Delivery happens on the
    /// snapshot so no shard lock is held while sending or evicting.
    pub fn sinks_for(&self, channel: &str) -> Vec<(ConnectionId, Arc<dyn EventSink>)> {
        let Some(connection_ids) = self.channel_index.get(channel) else {
            return Vec::new();
        };
        connection_ids
            .iter()
            .filter_map(|conn_id| {
                self.connections
                    .get(conn_id)
                    .map(|info| (conn_id.clone(), info.sink.clone()))
            })
            .collect()
    }

    /// Snapshot of every registered sink.
    pub fn all_sinks(&self) -> Vec<(ConnectionId, Arc<dyn EventSink>)> {
        self.connections
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().sink.clone()))
            .collect()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Sink that stores every frame it receives.
    #[derive(Default)]
    pub struct CollectingSink {
        frames: Mutex<Vec<Frame>>,
    }

    impl CollectingSink {
        pub fn frames(&self) -> Vec<Frame> {
            self.frames.lock().unwrap().clone()
        }

        /// Parsed JSON payloads of the collected frames.
        pub fn payloads(&self) -> Vec<serde_json::Value> {
            self.frames().iter().map(parse_frame).collect()
        }
    }

    impl EventSink for CollectingSink {
        fn send(&self, frame: Frame) -> Result<(), WriteError> {
            self.frames.lock().unwrap().push(frame);
            Ok(())
        }
    }

    /// Sink whose writes always fail, standing in for a dead client.
    pub struct FailingSink;

    impl EventSink for FailingSink {
        fn send(&self, _frame: Frame) -> Result<(), WriteError> {
            Err(WriteError)
        }
    }

    /// Strips the SSE framing from one frame and parses the JSON payload.
    pub fn parse_frame(frame: &Frame) -> serde_json::Value {
        let text = std::str::from_utf8(frame.as_bytes()).unwrap();
        let json = text
            .strip_prefix("data: ")
            .and_then(|rest| rest.strip_suffix("\n\n"))
            .unwrap_or_else(|| panic!("frame is not SSE-framed: {text:?}"));
        serde_json::from_str(json).unwrap()
    }
}
