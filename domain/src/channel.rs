//! The channel catalog and its lifecycle rules.

use crate::events::{DomainEvent, EventPublisher};
use crate::DEFAULT_CHANNEL_ID;
use log::*;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use utoipa::ToSchema;

/// A chat channel as seen by clients. `user_count` is derived from the
/// presence map and only ever written through [`ChannelDirectory`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub user_count: usize,
}

impl Channel {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            user_count: 0,
        }
    }
}

/// Canonical list of channels. One lock guards the whole list; iteration
/// order is insertion order, which is also the order clients see.
///
/// Lifecycle rules: creation is idempotent, a channel whose user count
/// drops to zero is deleted automatically, and the default channel is
/// exempt from deletion entirely.
#[derive(Debug, Default)]
pub struct ChannelDirectory {
    channels: RwLock<Vec<Channel>>,
}

impl ChannelDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a channel, or returns the existing one with the same id
    /// untouched. `ChannelCreated` is published only on first creation.
    pub async fn create_channel(
        &self,
        publisher: &EventPublisher,
        id: &str,
        name: &str,
    ) -> Channel {
        let (channel, created) = {
            let mut channels = self.channels.write().await;
            match channels.iter().find(|c| c.id == id) {
                Some(existing) => (existing.clone(), false),
                None => {
                    let channel = Channel::new(id, name);
                    channels.push(channel.clone());
                    (channel, true)
                }
            }
        };

        if created {
            info!("Channel created: {} ({})", channel.id, channel.name);
            publisher
                .publish(DomainEvent::ChannelCreated {
                    channel: channel.clone(),
                })
                .await;
        } else {
            debug!("Channel {id} already exists");
        }

        channel
    }

    /// Deletes a channel and publishes `ChannelDeleted`. Returns `false`
    /// when the id is unknown. The default channel cannot be deleted.
    pub async fn delete_channel(&self, publisher: &EventPublisher, id: &str) -> bool {
        if id == DEFAULT_CHANNEL_ID {
            warn!("Refusing to delete the default channel");
            return false;
        }

        let removed = {
            let mut channels = self.channels.write().await;
            channels
                .iter()
                .position(|c| c.id == id)
                .map(|idx| channels.remove(idx))
        };

        match removed {
            Some(channel) => {
                info!("Channel deleted: {id}");
                publisher
                    .publish(DomainEvent::ChannelDeleted { channel })
                    .await;
                true
            }
            None => false,
        }
    }

    /// Records a recomputed user count for a channel and publishes
    /// `ChannelUpdated`. A count of zero deletes the channel instead
    /// (publishing `ChannelDeleted`) unless it is the default channel.
    /// Unknown ids are ignored and publish nothing.
    pub async fn update_user_count(
        &self,
        publisher: &EventPublisher,
        id: &str,
        count: usize,
    ) -> Option<Channel> {
        let updated = {
            let mut channels = self.channels.write().await;
            channels.iter_mut().find(|c| c.id == id).map(|channel| {
                channel.user_count = count;
                channel.clone()
            })
        };

        let channel = updated?;
        if channel.user_count == 0 && channel.id != DEFAULT_CHANNEL_ID {
            debug!("Channel {id} is empty, deleting it");
            self.delete_channel(publisher, id).await;
            return None;
        }

        publisher
            .publish(DomainEvent::ChannelUpdated {
                channel: channel.clone(),
            })
            .await;
        Some(channel)
    }

    pub async fn get_channel(&self, id: &str) -> Option<Channel> {
        self.channels.read().await.iter().find(|c| c.id == id).cloned()
    }

    /// All channels in creation order.
    pub async fn list_channels(&self) -> Vec<Channel> {
        self.channels.read().await.clone()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.channels.read().await.iter().any(|c| c.id == id)
    }
}
