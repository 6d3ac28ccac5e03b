//! Persisted entity structs and the payloads derived from them.
//!
//! These mirror the rows owned by the persistence layer. The relay only
//! reads and writes them through the repository traits in `cop-db`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use validator::Validate;

use crate::enums::{ChannelType, MessagePriority, MessageType, UnitStatus};
use crate::ids::{ChannelId, MessageId, UnitId};
use crate::topic::TopicKey;

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// A chat channel belonging to an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Channel {
    /// Channel identifier.
    pub id: ChannelId,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Purpose of the channel.
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    /// Operation the channel belongs to.
    pub operation_id: TopicKey,
    /// User who created the channel.
    pub created_by: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A chat message as committed by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ChatMessage {
    /// Message identifier.
    pub id: MessageId,
    /// Channel the message was posted to.
    pub channel_id: ChannelId,
    /// Sender's user identifier.
    pub sender_id: String,
    /// Sender's display name.
    pub sender_name: String,
    /// Message body.
    pub content: String,
    /// Content type.
    #[serde(rename = "type")]
    pub message_type: MessageType,
    /// Delivery priority.
    pub priority: MessagePriority,
    /// Whether the message has been edited since posting.
    pub is_edited: bool,
    /// Time of the last edit, if any.
    pub edited_at: Option<DateTime<Utc>>,
    /// Commit time.
    pub created_at: DateTime<Utc>,
}

/// A chat message that has not been written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatMessage {
    /// Target channel.
    pub channel_id: ChannelId,
    /// Sender's user identifier.
    pub sender_id: String,
    /// Sender's display name.
    pub sender_name: String,
    /// Message body (already validated non-empty).
    pub content: String,
    /// Content type.
    pub message_type: MessageType,
    /// Delivery priority.
    pub priority: MessagePriority,
}

impl NewChatMessage {
    /// A plain text message at normal priority.
    pub const fn text(
        channel_id: ChannelId,
        sender_id: String,
        sender_name: String,
        content: String,
    ) -> Self {
        Self {
            channel_id,
            sender_id,
            sender_name,
            content,
            message_type: MessageType::Text,
            priority: MessagePriority::Normal,
        }
    }
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// A tracked unit on the operational picture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Storage identifier.
    pub id: UnitId,
    /// Unique call sign; the unit's public identifier.
    pub call_sign: String,
    /// Unit type (e.g. `infantry`, `armor`).
    pub unit_type: String,
    /// Affiliation.
    pub status: UnitStatus,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Heading in degrees, if reported.
    pub heading: Option<f64>,
    /// Speed, if reported.
    pub speed: Option<f64>,
    /// Time of the last position report.
    pub last_update: DateTime<Utc>,
    /// Commanding user.
    pub commander_id: String,
}

impl Unit {
    /// Apply a validated position report, stamping `last_update` with `at`.
    #[must_use]
    pub fn with_position(mut self, fix: &PositionFix, at: DateTime<Utc>) -> Self {
        self.latitude = fix.latitude;
        self.longitude = fix.longitude;
        self.heading = fix.heading;
        self.speed = fix.speed;
        self.last_update = at;
        self
    }
}

/// Inbound position report. Latitude and longitude are mandatory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PositionUpdate {
    /// Latitude in decimal degrees.
    #[validate(required(message = "latitude is required"))]
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees.
    #[validate(required(message = "longitude is required"))]
    pub longitude: Option<f64>,
    /// Heading in degrees.
    #[serde(default)]
    pub heading: Option<f64>,
    /// Speed.
    #[serde(default)]
    pub speed: Option<f64>,
}

impl PositionUpdate {
    /// Convert to a [`PositionFix`] once both coordinates are present.
    pub const fn fix(&self) -> Option<PositionFix> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(PositionFix {
                latitude,
                longitude,
                heading: self.heading,
                speed: self.speed,
            }),
            _ => None,
        }
    }
}

/// A position report with both coordinates present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Heading in degrees.
    pub heading: Option<f64>,
    /// Speed.
    pub speed: Option<f64>,
}

/// Position payload pushed to position stream subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct UnitPosition {
    /// Call sign of the unit.
    pub unit_id: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Heading in degrees.
    pub heading: Option<f64>,
    /// Speed.
    pub speed: Option<f64>,
    /// Affiliation label (`FRIENDLY`, `ENEMY`, ...).
    pub status: UnitStatus,
    /// Time of the report.
    pub timestamp: DateTime<Utc>,
}

impl From<&Unit> for UnitPosition {
    fn from(unit: &Unit) -> Self {
        Self {
            unit_id: unit.call_sign.clone(),
            latitude: unit.latitude,
            longitude: unit.longitude,
            heading: unit.heading,
            speed: unit.speed,
            status: unit.status,
            timestamp: unit.last_update,
        }
    }
}
