use crate::broadcaster::EventBroadcaster;
use crate::connection::ConnectionRegistry;
use crate::message::{ChannelEvent, PresenceChange, PresenceChangeKind};
use async_trait::async_trait;
use domain::{ChannelDirectory, DomainEvent, EventHandler};
use log::*;
use std::sync::Arc;

/// Handles domain events by converting them to wire events and broadcasting
/// them to the affected connections.
///
/// Scope follows the event: channel-list changes go to every connection
/// (any client may be rendering the channel list), while message and
/// presence events go only to the subscribers of that channel.
pub struct ChannelEventHandler {
    broadcaster: Arc<EventBroadcaster>,
    directory: Arc<ChannelDirectory>,
    registry: Arc<ConnectionRegistry>,
}

impl ChannelEventHandler {
    pub fn new(
        broadcaster: Arc<EventBroadcaster>,
        directory: Arc<ChannelDirectory>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            broadcaster,
            directory,
            registry,
        }
    }

    /// Builds the channel-list snapshot the directory events carry: current
    /// channels, a timestamp, and the total connection count.
    async fn directory_event(
        &self,
        build: impl FnOnce(Vec<domain::Channel>, String, usize) -> ChannelEvent + Send,
    ) -> ChannelEvent {
        let channels = self.directory.list_channels().await;
        let connection_count = self.registry.total_count();
        build(channels, domain::now_iso8601(), connection_count)
    }
}

#[async_trait]
impl EventHandler for ChannelEventHandler {
    async fn handle(&self, event: &DomainEvent) {
        match event {
            DomainEvent::ChannelCreated { channel } => {
                debug!("Handling ChannelCreated event for channel {}", channel.id);
                let wire = self
                    .directory_event(|channels, timestamp, connection_count| {
                        ChannelEvent::ChannelCreated {
                            channels,
                            timestamp,
                            connection_count,
                        }
                    })
                    .await;
                self.broadcaster.broadcast_all(&wire);
            }

            DomainEvent::ChannelUpdated { channel } => {
                debug!("Handling ChannelUpdated event for channel {}", channel.id);
                let wire = self
                    .directory_event(|channels, timestamp, connection_count| {
                        ChannelEvent::ChannelUpdated {
                            channels,
                            timestamp,
                            connection_count,
                        }
                    })
                    .await;
                self.broadcaster.broadcast_all(&wire);
            }

            DomainEvent::ChannelDeleted { channel } => {
                debug!("Handling ChannelDeleted event for channel {}", channel.id);
                let wire = self
                    .directory_event(|channels, timestamp, connection_count| {
                        ChannelEvent::ChannelDeleted {
                            channels,
                            timestamp,
                            connection_count,
                        }
                    })
                    .await;
                self.broadcaster.broadcast_all(&wire);
            }

            DomainEvent::UserJoined { channel_id, user } => {
                debug!("Handling UserJoined event for channel {channel_id}");
                let wire = ChannelEvent::UserEvent {
                    event: PresenceChange {
                        kind: PresenceChangeKind::Join,
                        user: user.clone(),
                        channel_id: channel_id.clone(),
                    },
                };
                self.broadcaster.broadcast(channel_id, &wire);
            }

            DomainEvent::UserLeft { channel_id, user } => {
                debug!("Handling UserLeft event for channel {channel_id}");
                let wire = ChannelEvent::UserEvent {
                    event: PresenceChange {
                        kind: PresenceChangeKind::Leave,
                        user: user.clone(),
                        channel_id: channel_id.clone(),
                    },
                };
                self.broadcaster.broadcast(channel_id, &wire);
            }

            DomainEvent::MessagePosted {
                channel_id,
                message,
            } => {
                debug!("Handling MessagePosted event for channel {channel_id}");
                let wire = ChannelEvent::Message {
                    channel_id: channel_id.clone(),
                    data: message.clone(),
                };
                self.broadcaster.broadcast(channel_id, &wire);
            }
        }
    }
}
