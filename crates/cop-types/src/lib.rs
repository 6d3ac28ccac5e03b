//! Shared type definitions for the COP real-time relay.
//!
//! This crate is the single source of truth for the records that cross
//! the relay's boundaries: identifiers, topic keys, chat socket frames,
//! domain events, and the persisted entities the command processors
//! read and write. Wire types flow to `TypeScript` via `ts-rs` for the
//! operational-picture dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers
//! - [`topic`] -- Validated operation identifiers used as fan-out topics
//! - [`enums`] -- Stream kinds and persisted enumerations
//! - [`structs`] -- Channels, chat messages, units, position payloads
//! - [`frame`] -- The chat socket frame
//! - [`event`] -- Immutable domain events handed to the broadcast hub

pub mod enums;
pub mod event;
pub mod frame;
pub mod ids;
pub mod structs;
pub mod topic;

// Re-export all public types at crate root for convenience.
pub use enums::{ChannelType, MessagePriority, MessageType, StreamKind, UnitStatus};
pub use event::{DomainEvent, EventPayload, EVENT_CONNECTED, EVENT_POSITION_UPDATE};
pub use frame::{ChatFrame, FRAME_ERROR, FRAME_NEW_MESSAGE, FRAME_SYSTEM, FRAME_SYSTEM_MESSAGE};
pub use ids::{ChannelId, ConnectionId, MessageId, UnitId};
pub use structs::{
    Channel, ChatMessage, NewChatMessage, PositionFix, PositionUpdate, Unit, UnitPosition,
};
pub use topic::{TopicKey, TopicKeyError};
