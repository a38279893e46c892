//! Per-channel user presence.

use crate::channel::ChannelDirectory;
use crate::events::{DomainEvent, EventPublisher};
use crate::now_iso8601;
use dashmap::DashMap;
use log::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

/// A user's presence record within one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    /// ISO-8601, set when the record is created.
    pub join_time: String,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            join_time: now_iso8601(),
        }
    }
}

/// Which users are currently in which channel. This map is the single
/// source of truth for `Channel::user_count`: every join/leave recomputes
/// the count through the directory, which in turn drives empty-channel
/// deletion. Channel entries whose maps empty out are dropped so the
/// tracker never accumulates dead keys.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    users: DashMap<String, HashMap<String, User>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `user` to a channel's presence map. Returns `false` without
    /// side effects when that user id is already present. Otherwise the
    /// channel's user count is recomputed and `UserJoined` is published.
    ///
    /// The channel does not have to exist in the directory; presence is
    /// tracked either way and the count update is then a no-op.
    pub async fn join(
        &self,
        directory: &ChannelDirectory,
        publisher: &EventPublisher,
        channel_id: &str,
        user: User,
    ) -> bool {
        let count = {
            let mut entry = self.users.entry(channel_id.to_string()).or_default();
            if entry.contains_key(&user.id) {
                debug!("User {} is already in channel {channel_id}", user.id);
                return false;
            }
            entry.insert(user.id.clone(), user.clone());
            entry.len()
        };

        info!("User {} joined channel {channel_id}", user.id);
        directory
            .update_user_count(publisher, channel_id, count)
            .await;
        publisher
            .publish(DomainEvent::UserJoined {
                channel_id: channel_id.to_string(),
                user,
            })
            .await;
        true
    }

    /// Removes a user from a channel's presence map and returns the
    /// record. Recomputes the channel's user count (which deletes the
    /// channel when it empties, default channel excepted) and publishes
    /// `UserLeft`. Unknown channel or user ids return `None` silently.
    pub async fn leave(
        &self,
        directory: &ChannelDirectory,
        publisher: &EventPublisher,
        channel_id: &str,
        user_id: &str,
    ) -> Option<User> {
        let (removed, count) = match self.users.get_mut(channel_id) {
            Some(mut entry) => {
                let removed = entry.remove(user_id);
                let count = entry.len();
                if entry.is_empty() {
                    drop(entry);
                    self.users.remove(channel_id);
                }
                (removed, count)
            }
            None => (None, 0),
        };

        let user = removed?;
        info!("User {user_id} left channel {channel_id}");
        directory
            .update_user_count(publisher, channel_id, count)
            .await;
        publisher
            .publish(DomainEvent::UserLeft {
                channel_id: channel_id.to_string(),
                user: user.clone(),
            })
            .await;
        Some(user)
    }

    /// Current presence records for a channel.
    pub fn list_users(&self, channel_id: &str) -> Vec<User> {
        self.users
            .get(channel_id)
            .map(|entry| entry.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn user_count(&self, channel_id: &str) -> usize {
        self.users.get(channel_id).map(|entry| entry.len()).unwrap_or(0)
    }

    /// Drops a channel's presence map wholesale. Used when a channel is
    /// deleted by an admin action rather than by emptying out.
    pub fn remove_channel(&self, channel_id: &str) {
        self.users.remove(channel_id);
    }
}
