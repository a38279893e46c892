use axum::body::Bytes;
use domain::{Channel, User};
use serde::Serialize;

/// Trait for getting the wire-level event type tag
pub trait EventType {
    fn event_type(&self) -> &'static str;
}

/// Everything that can go over a channel stream. The `type` tag and the
/// camelCase payload fields are part of the client contract; adding a
/// variant here is the only way to put a new event shape on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChannelEvent {
    /// First frame of every stream, sent directly to the new connection.
    #[serde(rename_all = "camelCase")]
    Connect {
        message: String,
        channel_id: String,
        connection_count: usize,
        users: Vec<User>,
        #[serde(skip_serializing_if = "Option::is_none")]
        current_user: Option<User>,
        channels: Vec<Channel>,
    },
    /// Periodic keep-alive, sent directly to one connection.
    #[serde(rename_all = "camelCase")]
    Ping {
        channel_id: String,
        timestamp: String,
        connection_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    ChannelCreated {
        channels: Vec<Channel>,
        timestamp: String,
        connection_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    ChannelUpdated {
        channels: Vec<Channel>,
        timestamp: String,
        connection_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    ChannelDeleted {
        channels: Vec<Channel>,
        timestamp: String,
        connection_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    Message {
        channel_id: String,
        data: domain::Message,
    },
    UserEvent { event: PresenceChange },
}

/// Payload of a `user-event` frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceChange {
    #[serde(rename = "type")]
    pub kind: PresenceChangeKind,
    pub user: User,
    pub channel_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceChangeKind {
    Join,
    Leave,
}

impl EventType for ChannelEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ChannelEvent::Connect { .. } => "connect",
            ChannelEvent::Ping { .. } => "ping",
            ChannelEvent::ChannelCreated { .. } => "channel-created",
            ChannelEvent::ChannelUpdated { .. } => "channel-updated",
            ChannelEvent::ChannelDeleted { .. } => "channel-deleted",
            ChannelEvent::Message { .. } => "message",
            ChannelEvent::UserEvent { .. } => "user-event",
        }
    }
}

/// One SSE frame (`data: <JSON>\n\n`), serialized once and shared across
/// every connection it is delivered to.
#[derive(Debug, Clone)]
pub struct Frame(Bytes);

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl ChannelEvent {
    /// Serializes this event into its wire frame.
    pub fn to_frame(&self) -> Result<Frame, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(Frame(Bytes::from(format!("data: {json}\n\n"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_json(event: &ChannelEvent) -> serde_json::Value {
        crate::connection::test_support::parse_frame(&event.to_frame().unwrap())
    }

    #[test]
    fn frames_carry_the_sse_data_prefix_and_blank_line() {
        let frame = ChannelEvent::Ping {
            channel_id: "general".into(),
            timestamp: "2026-01-02T03:04:05.678Z".into(),
            connection_count: 3,
        }
        .to_frame()
        .unwrap();

        let text = std::str::from_utf8(frame.as_bytes()).unwrap();
        assert!(text.starts_with("data: {"));
        assert!(text.ends_with("\n\n"));
    }

    #[test]
    fn event_tags_are_kebab_case() {
        let event = ChannelEvent::ChannelCreated {
            channels: vec![],
            timestamp: "2026-01-02T03:04:05.678Z".into(),
            connection_count: 0,
        };
        assert_eq!(frame_json(&event)["type"], "channel-created");
        assert_eq!(event.event_type(), "channel-created");

        let event = ChannelEvent::UserEvent {
            event: PresenceChange {
                kind: PresenceChangeKind::Leave,
                user: User::new("u1", "Alice"),
                channel_id: "general".into(),
            },
        };
        assert_eq!(frame_json(&event)["type"], "user-event");
        assert_eq!(frame_json(&event)["event"]["type"], "leave");
        assert_eq!(frame_json(&event)["event"]["channelId"], "general");
    }

    #[test]
    fn connect_payload_uses_camel_case_fields() {
        let event = ChannelEvent::Connect {
            message: "connected".into(),
            channel_id: "general".into(),
            connection_count: 1,
            users: vec![User::new("u1", "Alice")],
            current_user: Some(User::new("u1", "Alice")),
            channels: vec![Channel::new("general", "General")],
        };

        let json = frame_json(&event);
        assert_eq!(json["channelId"], "general");
        assert_eq!(json["connectionCount"], 1);
        assert_eq!(json["currentUser"]["name"], "Alice");
        assert_eq!(json["channels"][0]["userCount"], 0);
        assert!(json["users"][0]["joinTime"].is_string());
    }

    #[test]
    fn connect_without_identity_omits_current_user() {
        let event = ChannelEvent::Connect {
            message: "connected".into(),
            channel_id: "general".into(),
            connection_count: 1,
            users: vec![],
            current_user: None,
            channels: vec![],
        };

        assert!(frame_json(&event).get("currentUser").is_none());
    }

    #[test]
    fn message_event_nests_the_message_under_data() {
        let message = domain::Message::compose(
            "general",
            "hello".into(),
            "alice".into(),
            Some("msg-1".into()),
            Some("2026-01-02T03:04:05.678Z".into()),
        )
        .unwrap();
        let event = ChannelEvent::Message {
            channel_id: "general".into(),
            data: message,
        };

        let json = frame_json(&event);
        assert_eq!(json["type"], "message");
        assert_eq!(json["data"]["id"], "msg-1");
        assert_eq!(json["data"]["sender"], "alice");
    }
}
