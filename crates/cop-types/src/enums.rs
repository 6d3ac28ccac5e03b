//! Enumeration types shared by the relay, the store, and the dashboard.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Stream kinds
// ---------------------------------------------------------------------------

/// The kind of live stream a connection is attached to.
///
/// Each kind has its own topic registry in the broadcast hub, so a
/// position subscriber never sees chat traffic and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum StreamKind {
    /// Bidirectional operation chat over a `WebSocket`.
    Chat,
    /// Server-push unit position updates.
    Position,
    /// Server-push operation events.
    Event,
}

impl StreamKind {
    /// All stream kinds, in registry order.
    pub const ALL: [Self; 3] = [Self::Chat, Self::Position, Self::Event];

    /// Stable lowercase label used in logs and stats.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Position => "position",
            Self::Event => "event",
        }
    }

    /// Parse the path segment of a stream-creation request.
    ///
    /// Only the server-push kinds are addressable this way: `positions`
    /// and `events`. Chat is reached through the socket endpoint.
    pub fn from_stream_segment(segment: &str) -> Option<Self> {
        match segment {
            "positions" => Some(Self::Position),
            "events" => Some(Self::Event),
            _ => None,
        }
    }
}

impl core::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Generates `as_str` / `parse` helpers for enums stored as upper-case text.
macro_rules! db_text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Upper-case text form used in storage and on the wire.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }

            /// Parse the upper-case text form. Returns `None` for unknown values.
            pub fn parse(text: &str) -> Option<Self> {
                match text {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

/// Purpose of a chat channel within an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum ChannelType {
    /// The operation-wide channel every chat socket posts to.
    General,
    /// Command staff channel.
    Command,
    /// Channel scoped to a single unit.
    Unit,
    /// Direct conversation between members.
    Direct,
}

db_text_enum!(ChannelType {
    General => "GENERAL",
    Command => "COMMAND",
    Unit => "UNIT",
    Direct => "DIRECT",
});

/// Content type of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum MessageType {
    /// Plain text posted by a user.
    Text,
    /// Generated by the system.
    System,
    /// An alert that should stand out in the UI.
    Alert,
    /// A file reference.
    File,
}

db_text_enum!(MessageType {
    Text => "TEXT",
    System => "SYSTEM",
    Alert => "ALERT",
    File => "FILE",
});

/// Delivery priority of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum MessagePriority {
    /// Low priority.
    Low,
    /// Default priority for chat traffic.
    Normal,
    /// High priority.
    High,
    /// Urgent traffic.
    Urgent,
}

db_text_enum!(MessagePriority {
    Low => "LOW",
    Normal => "NORMAL",
    High => "HIGH",
    Urgent => "URGENT",
});

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Affiliation of a tracked unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum UnitStatus {
    /// Blue force.
    Friendly,
    /// Hostile.
    Enemy,
    /// Neither friendly nor hostile.
    Neutral,
    /// Affiliation not established.
    Unknown,
}

db_text_enum!(UnitStatus {
    Friendly => "FRIENDLY",
    Enemy => "ENEMY",
    Neutral => "NEUTRAL",
    Unknown => "UNKNOWN",
});
