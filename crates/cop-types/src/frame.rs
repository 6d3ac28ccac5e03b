//! The structured record exchanged over the chat socket.
//!
//! Inbound and outbound frames share one shape. Inbound frames are
//! commands (usually just `content`); outbound frames carry a `type` tag
//! such as `system`, `error`, `new_message`, or `system_message`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Outbound tag for connection acknowledgements and other system text.
pub const FRAME_SYSTEM: &str = "system";
/// Outbound tag for errors reported to a single connection.
pub const FRAME_ERROR: &str = "error";
/// Outbound tag for a newly persisted chat message.
pub const FRAME_NEW_MESSAGE: &str = "new_message";
/// Outbound tag for operation-wide system notices.
pub const FRAME_SYSTEM_MESSAGE: &str = "system_message";

/// One chat socket frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ChatFrame {
    /// Frame tag.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub frame_type: Option<String>,
    /// Sender's user identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    /// Sender's display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    /// Text body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Opaque structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Time the frame was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatFrame {
    /// A frame carrying only a tag and text content.
    pub fn text(frame_type: &str, content: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            frame_type: Some(frame_type.to_owned()),
            content: Some(content),
            timestamp: Some(timestamp),
            ..Self::default()
        }
    }

    /// A frame carrying a tag and a structured payload.
    pub fn with_data(frame_type: &str, data: serde_json::Value, timestamp: DateTime<Utc>) -> Self {
        Self {
            frame_type: Some(frame_type.to_owned()),
            data: Some(data),
            timestamp: Some(timestamp),
            ..Self::default()
        }
    }

    /// Trimmed text content, or `None` when missing or blank.
    pub fn non_empty_content(&self) -> Option<&str> {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}
