//! Domain events: immutable records handed to the broadcast hub.
//!
//! A [`DomainEvent`] is built once by a command processor (or by the hub
//! for connection acknowledgements) and never mutated afterwards. Each
//! transport adapter renders it in its own wire format: the chat socket
//! as a [`ChatFrame`], the server-push streams as a named event with a
//! text payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::StreamKind;
use crate::frame::{
    ChatFrame, FRAME_ERROR, FRAME_NEW_MESSAGE, FRAME_SYSTEM, FRAME_SYSTEM_MESSAGE,
};
use crate::structs::{ChatMessage, UnitPosition};
use crate::topic::TopicKey;

/// Push event name for connection acknowledgements.
pub const EVENT_CONNECTED: &str = "connected";
/// Push event name for unit position updates.
pub const EVENT_POSITION_UPDATE: &str = "position_update";

/// Kind-specific content of a [`DomainEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EventPayload {
    /// Sent once to a new connection, before anything else.
    Connected {
        /// Human-readable acknowledgement text.
        message: String,
    },
    /// A chat message that has been committed.
    ChatMessage(ChatMessage),
    /// A unit position that has been committed.
    PositionUpdate(UnitPosition),
    /// Operation-wide notice generated by the system.
    SystemNotice {
        /// Notice text.
        content: String,
    },
    /// Error reported to a single connection.
    ErrorNotice {
        /// Error text.
        content: String,
    },
    /// Caller-named operation event for the event stream.
    Operation {
        /// Event name pushed to subscribers.
        name: String,
        /// Structured event data.
        data: serde_json::Value,
    },
}

/// An immutable, broadcastable record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DomainEvent {
    /// Topic the event belongs to.
    pub topic: TopicKey,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Kind-specific content.
    pub payload: EventPayload,
}

impl DomainEvent {
    fn now(topic: &TopicKey, payload: EventPayload) -> Self {
        Self {
            topic: topic.clone(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Acknowledgement for a connection that just joined `topic`.
    pub fn connected(topic: &TopicKey, kind: StreamKind) -> Self {
        let message = match kind {
            StreamKind::Chat => format!("Connected to operation chat: {topic}"),
            StreamKind::Position => format!("Connected to position stream for operation: {topic}"),
            StreamKind::Event => format!("Connected to event stream for operation: {topic}"),
        };
        Self::now(topic, EventPayload::Connected { message })
    }

    /// A committed chat message.
    pub fn chat_message(topic: &TopicKey, message: ChatMessage) -> Self {
        Self::now(topic, EventPayload::ChatMessage(message))
    }

    /// A committed unit position.
    pub fn position_update(topic: &TopicKey, position: UnitPosition) -> Self {
        Self::now(topic, EventPayload::PositionUpdate(position))
    }

    /// An operation-wide system notice.
    pub fn system_notice(topic: &TopicKey, content: impl Into<String>) -> Self {
        Self::now(
            topic,
            EventPayload::SystemNotice {
                content: content.into(),
            },
        )
    }

    /// An error addressed to one connection.
    pub fn error_notice(topic: &TopicKey, content: impl Into<String>) -> Self {
        Self::now(
            topic,
            EventPayload::ErrorNotice {
                content: content.into(),
            },
        )
    }

    /// A caller-named operation event.
    pub fn operation(topic: &TopicKey, name: impl Into<String>, data: serde_json::Value) -> Self {
        Self::now(
            topic,
            EventPayload::Operation {
                name: name.into(),
                data,
            },
        )
    }

    /// Name under which the event is pushed to stream subscribers.
    pub fn event_name(&self) -> &str {
        match &self.payload {
            EventPayload::Connected { .. } => EVENT_CONNECTED,
            EventPayload::ChatMessage(_) => FRAME_NEW_MESSAGE,
            EventPayload::PositionUpdate(_) => EVENT_POSITION_UPDATE,
            EventPayload::SystemNotice { .. } => FRAME_SYSTEM_MESSAGE,
            EventPayload::ErrorNotice { .. } => FRAME_ERROR,
            EventPayload::Operation { name, .. } => name,
        }
    }

    /// Text body for a server-push event.
    ///
    /// Acknowledgements and notices are sent as plain text; structured
    /// payloads as JSON.
    pub fn push_data(&self) -> Result<String, serde_json::Error> {
        match &self.payload {
            EventPayload::Connected { message } => Ok(message.clone()),
            EventPayload::SystemNotice { content } | EventPayload::ErrorNotice { content } => {
                Ok(content.clone())
            }
            EventPayload::ChatMessage(message) => serde_json::to_string(message),
            EventPayload::PositionUpdate(position) => serde_json::to_string(position),
            EventPayload::Operation { data, .. } => serde_json::to_string(data),
        }
    }

    /// Render the event as an outbound chat socket frame.
    pub fn to_chat_frame(&self) -> Result<ChatFrame, serde_json::Error> {
        let at = self.timestamp;
        let frame = match &self.payload {
            EventPayload::Connected { message } => ChatFrame::text(FRAME_SYSTEM, message.clone(), at),
            EventPayload::SystemNotice { content } => {
                ChatFrame::text(FRAME_SYSTEM_MESSAGE, content.clone(), at)
            }
            EventPayload::ErrorNotice { content } => ChatFrame::text(FRAME_ERROR, content.clone(), at),
            EventPayload::ChatMessage(message) => {
                ChatFrame::with_data(FRAME_NEW_MESSAGE, serde_json::to_value(message)?, at)
            }
            EventPayload::PositionUpdate(position) => {
                ChatFrame::with_data(EVENT_POSITION_UPDATE, serde_json::to_value(position)?, at)
            }
            EventPayload::Operation { name, data } => ChatFrame::with_data(name, data.clone(), at),
        };
        Ok(frame)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::enums::{MessagePriority, MessageType};
    use crate::ids::{ChannelId, MessageId};

    fn topic() -> TopicKey {
        TopicKey::parse("op-42").unwrap()
    }

    #[test]
    fn connected_ack_renders_as_system_frame() {
        let event = DomainEvent::connected(&topic(), StreamKind::Chat);
        let frame = event.to_chat_frame().unwrap();
        assert_eq!(frame.frame_type.as_deref(), Some("system"));
        assert_eq!(frame.content.as_deref(), Some("Connected to operation chat: op-42"));
    }

    #[test]
    fn connected_ack_pushes_plain_text() {
        let event = DomainEvent::connected(&topic(), StreamKind::Position);
        assert_eq!(event.event_name(), "connected");
        assert_eq!(
            event.push_data().unwrap(),
            "Connected to position stream for operation: op-42"
        );
    }

    #[test]
    fn chat_message_renders_as_new_message_with_data() {
        let message = ChatMessage {
            id: MessageId::new(),
            channel_id: ChannelId::new(),
            sender_id: String::from("u-1"),
            sender_name: String::from("Alpha"),
            content: String::from("status green"),
            message_type: MessageType::Text,
            priority: MessagePriority::Normal,
            is_edited: false,
            edited_at: None,
            created_at: Utc::now(),
        };
        let event = DomainEvent::chat_message(&topic(), message);
        let frame = event.to_chat_frame().unwrap();
        assert_eq!(frame.frame_type.as_deref(), Some("new_message"));
        let data = frame.data.unwrap();
        assert_eq!(data["content"], "status green");
        assert_eq!(data["type"], "TEXT");
    }

    #[test]
    fn operation_event_uses_caller_name() {
        let event = DomainEvent::operation(&topic(), "phase_change", serde_json::json!({"phase": 2}));
        assert_eq!(event.event_name(), "phase_change");
        assert_eq!(event.push_data().unwrap(), r#"{"phase":2}"#);
    }
}
