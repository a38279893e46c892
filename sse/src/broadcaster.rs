use crate::connection::{ConnectionId, ConnectionRegistry, EventSink};
use crate::message::{ChannelEvent, EventType};
use log::*;
use std::sync::Arc;

/// Fans events out to live connections.
///
/// Events are serialized exactly once per broadcast and the resulting frame
/// is shared across sinks. A connection whose write fails is evicted from
/// the registry on the spot; the failure never aborts delivery to the
/// remaining connections and is never surfaced to the publisher.
pub struct EventBroadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl EventBroadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver an event to every connection subscribed to `channel`.
    /// A channel without connections is a quiet no-op.
    pub fn broadcast(&self, channel: &str, event: &ChannelEvent) {
        let targets = self.registry.sinks_for(channel);
        if targets.is_empty() {
            debug!(
                "No connections in channel {channel}, dropping {} event",
                event.event_type()
            );
            return;
        }

        debug!(
            "Broadcasting {} event to {} connection(s) in channel {channel}",
            event.event_type(),
            targets.len()
        );
        self.deliver(targets, event);
    }

    /// Deliver an event to every registered connection, whatever its channel.
    pub fn broadcast_all(&self, event: &ChannelEvent) {
        let targets = self.registry.all_sinks();
        if targets.is_empty() {
            return;
        }

        debug!(
            "Broadcasting {} event to all {} connection(s)",
            event.event_type(),
            targets.len()
        );
        self.deliver(targets, event);
    }

    fn deliver(&self, targets: Vec<(ConnectionId, Arc<dyn EventSink>)>, event: &ChannelEvent) {
        let frame = match event.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize {} event: {e}", event.event_type());
                return;
            }
        };

        for (connection_id, sink) in targets {
            if sink.send(frame.clone()).is_err() {
                warn!(
                    "Evicting connection {}: client is no longer reachable",
                    connection_id.as_str()
                );
                self.registry.remove(&connection_id);
            }
        }
    }
}
