//! HTTP surface of the chat relay: the axum router, the request handlers,
//! and the composition root that wires the channel directory and presence
//! tracker to the SSE transport.

use domain::{ChannelDirectory, EventPublisher, PresenceTracker};
use log::*;
use sse::{ChannelEventHandler, ConnectionRegistry, EventBroadcaster, SessionContext};
use std::sync::Arc;
use tokio::net::TcpListener;

mod error;

pub use error::Error;

pub(crate) mod controller;
pub(crate) mod middleware;
pub(crate) mod params;
pub mod router;
pub(crate) mod stream;

/// Application state shared by every handler. Cheap to clone: every field
/// is an `Arc` or a small handle around one.
#[derive(Clone)]
pub struct AppState {
    pub service: service::AppState,
    pub registry: Arc<ConnectionRegistry>,
    pub directory: Arc<ChannelDirectory>,
    pub presence: Arc<PresenceTracker>,
    pub publisher: EventPublisher,
}

impl AppState {
    /// Wires the full event pipeline: domain operations publish through
    /// `publisher`, the channel event handler converts each event to its
    /// wire form, and the broadcaster fans it out to the registered
    /// connections.
    pub fn new(service: service::AppState) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let directory = Arc::new(ChannelDirectory::new());
        let presence = Arc::new(PresenceTracker::new());

        let broadcaster = Arc::new(EventBroadcaster::new(registry.clone()));
        let handler = Arc::new(ChannelEventHandler::new(
            broadcaster,
            directory.clone(),
            registry.clone(),
        ));
        let publisher = EventPublisher::new().with_handler(handler);

        Self {
            service,
            registry,
            directory,
            presence,
            publisher,
        }
    }

    /// The slice of state a streaming session carries through its lifecycle.
    pub fn session_context(&self) -> SessionContext {
        SessionContext {
            registry: self.registry.clone(),
            directory: self.directory.clone(),
            presence: self.presence.clone(),
            publisher: self.publisher.clone(),
            keep_alive: self.service.config.keep_alive_interval(),
        }
    }
}

pub async fn init_server(app_state: AppState) -> Result<(), std::io::Error> {
    let address = format!(
        "{}:{}",
        app_state.service.config.interface, app_state.service.config.port
    );
    let listener = TcpListener::bind(&address).await?;
    info!("Server starting... listening for connections on http://{address}");

    axum::serve(listener, router::define_routes(app_state)).await
}
