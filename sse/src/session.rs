use crate::connection::{ConnectionId, ConnectionRegistry, EventSink};
use crate::message::ChannelEvent;
use domain::{ChannelDirectory, EventPublisher, PresenceTracker, User};
use log::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Lifecycle of one streaming connection. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    Streaming,
    Closed,
}

/// Shared services a session needs to run its lifecycle.
#[derive(Clone)]
pub struct SessionContext {
    pub registry: Arc<ConnectionRegistry>,
    pub directory: Arc<ChannelDirectory>,
    pub presence: Arc<PresenceTracker>,
    pub publisher: EventPublisher,
    pub keep_alive: Duration,
}

/// One subscriber's stream, from registration to cleanup.
///
/// Opening a session registers the sink, joins presence (when a user
/// identity was supplied), pushes the `connect` snapshot directly to this
/// connection, and arms the keep-alive task. Closing is idempotent and runs
/// the teardown in reverse: cancel keep-alive, deregister, leave presence
/// (which recomputes the channel's user count and may delete the channel).
///
/// Dropping the session closes it; the HTTP layer moves the session into
/// the response body stream so a client disconnect drops it naturally.
pub struct ChannelStreamSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    connection_id: ConnectionId,
    channel_id: String,
    user: Option<User>,
    sink: Arc<dyn EventSink>,
    context: SessionContext,
    state: Mutex<SessionState>,
    keep_alive_task: Mutex<Option<JoinHandle<()>>>,
}

impl ChannelStreamSession {
    /// Registers a new connection for `channel_id` and brings the stream up.
    /// The returned session is already `Streaming` unless the very first
    /// write failed, in which case it comes back `Closed`.
    pub async fn open(
        context: SessionContext,
        channel_id: &str,
        user: Option<User>,
        sink: Arc<dyn EventSink>,
    ) -> ChannelStreamSession {
        let connection_id = context.registry.register(channel_id, sink.clone());
        info!(
            "Opened stream session {} for channel {channel_id}",
            connection_id.as_str()
        );

        let inner = Arc::new(SessionInner {
            connection_id,
            channel_id: channel_id.to_string(),
            user,
            sink,
            context,
            state: Mutex::new(SessionState::Initializing),
            keep_alive_task: Mutex::new(None),
        });

        // The connection is already registered, so the join broadcast below
        // is observed by this subscriber too.
        if let Some(user) = &inner.user {
            inner
                .context
                .presence
                .join(
                    &inner.context.directory,
                    &inner.context.publisher,
                    &inner.channel_id,
                    user.clone(),
                )
                .await;
        }

        if !inner.send_connect_snapshot().await {
            inner.close().await;
            return ChannelStreamSession { inner };
        }

        inner.spawn_keep_alive().await;
        *inner.state.lock().await = SessionState::Streaming;

        ChannelStreamSession { inner }
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.inner.connection_id
    }

    pub fn channel_id(&self) -> &str {
        &self.inner.channel_id
    }

    pub async fn state(&self) -> SessionState {
        *self.inner.state.lock().await
    }

    /// Tears the session down. Safe to call any number of times.
    pub async fn close(&self) {
        self.inner.close().await;
    }
}

impl Drop for ChannelStreamSession {
    fn drop(&mut self) {
        // Client disconnects surface as the response body (and with it this
        // session) being dropped; finish the teardown asynchronously.
        let inner = Arc::clone(&self.inner);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { inner.close().await });
        }
    }
}

impl SessionInner {
    /// Sends the `connect` snapshot directly to this connection (never
    /// broadcast). Returns `false` when the connection cannot be written.
    async fn send_connect_snapshot(&self) -> bool {
        let connect = ChannelEvent::Connect {
            message: "connected".to_string(),
            channel_id: self.channel_id.clone(),
            connection_count: self.context.registry.count_for(&self.channel_id),
            users: self.context.presence.list_users(&self.channel_id),
            current_user: self.user.clone(),
            channels: self.context.directory.list_channels().await,
        };

        let frame = match connect.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize connect event: {e}");
                return true;
            }
        };

        if self.sink.send(frame).is_err() {
            warn!(
                "Connection {} was unwritable before the connect event",
                self.connection_id.as_str()
            );
            return false;
        }
        true
    }

    async fn spawn_keep_alive(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.context.keep_alive);
            // interval fires immediately; the first ping belongs one period in
            ticker.tick().await;
            loop {
                ticker.tick().await;

                let ping = ChannelEvent::Ping {
                    channel_id: inner.channel_id.clone(),
                    timestamp: domain::now_iso8601(),
                    connection_count: inner.context.registry.count_for(&inner.channel_id),
                };
                let frame = match ping.to_frame() {
                    Ok(frame) => frame,
                    Err(e) => {
                        error!("Failed to serialize ping event: {e}");
                        continue;
                    }
                };

                if inner.sink.send(frame).is_err() {
                    debug!(
                        "Keep-alive write failed for connection {}, closing session",
                        inner.connection_id.as_str()
                    );
                    // Close from a fresh task: close() aborts this one.
                    let inner = Arc::clone(&inner);
                    tokio::spawn(async move { inner.close().await });
                    break;
                }
            }
        });
        *self.keep_alive_task.lock().await = Some(handle);
    }

    async fn close(&self) {
        {
            let mut state = self.state.lock().await;
            if *state == SessionState::Closed {
                return;
            }
            *state = SessionState::Closed;
        }

        if let Some(task) = self.keep_alive_task.lock().await.take() {
            task.abort();
        }

        self.context.registry.remove(&self.connection_id);

        if let Some(user) = &self.user {
            self.context
                .presence
                .leave(
                    &self.context.directory,
                    &self.context.publisher,
                    &self.channel_id,
                    &user.id,
                )
                .await;
        }

        info!(
            "Closed stream session {} for channel {}",
            self.connection_id.as_str(),
            self.channel_id
        );
    }
}
