//! Chat messages. Messages are broadcast-and-forget: nothing here is
//! persisted, a message only exists between the publish request and the
//! fan-out to live connections.

use crate::error::Error;
use crate::now_iso8601;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub content: String,
    pub sender: String,
    /// ISO-8601, set by the server when the sender did not supply one.
    pub timestamp: String,
}

impl Message {
    /// Builds a broadcast-ready message for `channel_id`, filling in the
    /// server-owned fields (`id`, `timestamp`) when absent. Empty `content`
    /// or `sender` is a validation error.
    pub fn compose(
        channel_id: &str,
        content: String,
        sender: String,
        id: Option<String>,
        timestamp: Option<String>,
    ) -> Result<Message, Error> {
        if content.is_empty() || sender.is_empty() {
            return Err(Error::validation("content and sender are required"));
        }

        Ok(Message {
            id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            channel_id: channel_id.to_string(),
            content,
            sender,
            timestamp: timestamp.unwrap_or_else(now_iso8601),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainErrorKind;

    #[test]
    fn compose_fills_id_and_timestamp() {
        let message = Message::compose("general", "hello".into(), "alice".into(), None, None)
            .unwrap();

        assert_eq!(message.channel_id, "general");
        assert!(!message.id.is_empty());
        assert!(message.timestamp.ends_with('Z'));
    }

    #[test]
    fn compose_keeps_sender_supplied_fields() {
        let message = Message::compose(
            "general",
            "hello".into(),
            "alice".into(),
            Some("msg-1".into()),
            Some("2026-01-02T03:04:05.678Z".into()),
        )
        .unwrap();

        assert_eq!(message.id, "msg-1");
        assert_eq!(message.timestamp, "2026-01-02T03:04:05.678Z");
    }

    #[test]
    fn compose_rejects_empty_content_or_sender() {
        for (content, sender) in [("", "alice"), ("hello", "")] {
            let result =
                Message::compose("general", content.into(), sender.into(), None, None);
            match result {
                Err(err) => assert!(matches!(
                    err.error_kind,
                    DomainErrorKind::Validation(_)
                )),
                Ok(_) => panic!("expected a validation error"),
            }
        }
    }

    #[test]
    fn message_serializes_with_camel_case_fields() {
        let message = Message {
            id: "msg-1".into(),
            channel_id: "general".into(),
            content: "hello".into(),
            sender: "alice".into(),
            timestamp: "2026-01-02T03:04:05.678Z".into(),
        };

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["channelId"], "general");
        assert!(value.get("channel_id").is_none());
    }
}
