use anyhow::Result;
use eventsource_client::{self as es, Client};
use futures_util::stream::StreamExt;
use log::*;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identity a test connection subscribes with.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub user_id: String,
    pub user_name: String,
}

impl TestUser {
    pub fn new(user_name: &str) -> Self {
        Self {
            user_id: Uuid::new_v4().to_string(),
            user_name: user_name.to_string(),
        }
    }
}

/// One event received off a stream. The relay sends every frame as a plain
/// `data:` line, so the discriminator is the `type` field inside the JSON,
/// not the SSE event name.
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: String,
    pub data: Value,
    pub timestamp: Instant,
}

pub struct Connection {
    pub user_label: String,
    event_rx: mpsc::UnboundedReceiver<Event>,
    _handle: tokio::task::JoinHandle<()>,
}

impl Connection {
    pub async fn establish(base_url: &str, channel_id: &str, user: &TestUser) -> Result<Self> {
        let url = format!(
            "{}/channels/{}?userName={}&userId={}",
            base_url, channel_id, user.user_name, user.user_id
        );
        let (tx, rx) = mpsc::unbounded_channel();

        let client = es::ClientBuilder::for_url(&url)?.build();

        let label = user.user_name.clone();
        let handle = tokio::spawn(async move {
            let mut stream = client.stream();

            loop {
                match stream.next().await {
                    Some(Ok(es::SSE::Event(event))) => {
                        if let Ok(data) = serde_json::from_str::<Value>(&event.data) {
                            let event_type =
                                data["type"].as_str().unwrap_or("unknown").to_string();
                            let sse_event = Event {
                                event_type,
                                data,
                                timestamp: Instant::now(),
                            };

                            if tx.send(sse_event).is_err() {
                                debug!("SSE receiver dropped for {}", label);
                                break;
                            }
                        }
                    }
                    Some(Ok(es::SSE::Comment(_))) => {
                        // Ignore comments
                    }
                    Some(Err(e)) => {
                        warn!("SSE error for {}: {}", label, e);
                    }
                    None => {
                        debug!("SSE stream ended for {}", label);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            user_label: user.user_name.clone(),
            event_rx: rx,
            _handle: handle,
        })
    }

    /// Waits for the next event of the wanted type, discarding everything
    /// else that arrives in the meantime.
    pub async fn wait_for_event(&mut self, event_type: &str, timeout: Duration) -> Result<Event> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                anyhow::bail!("Timeout waiting for event: {}", event_type);
            }

            match tokio::time::timeout(remaining, self.event_rx.recv()).await {
                Ok(Some(event)) if event.event_type == event_type => {
                    return Ok(event);
                }
                Ok(Some(_)) => {
                    // Wrong event type, keep waiting
                    continue;
                }
                Ok(None) => {
                    anyhow::bail!("SSE connection closed");
                }
                Err(_) => {
                    anyhow::bail!("Timeout waiting for event: {}", event_type);
                }
            }
        }
    }
}
