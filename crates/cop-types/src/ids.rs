//! Identifiers minted by the relay.
//!
//! A connection id names one live socket or stream in logs and in the hub;
//! channel, message and unit ids are the storage keys of persisted records.
//! All of them are UUID v7. Operations are
//! addressed by a caller-chosen [`crate::topic::TopicKey`] instead.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Declares an opaque UUID-backed id. The wire form is the bare UUID.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(Uuid);

        impl $name {
            /// Mint a fresh id stamped with the current time.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// The UUID as bound to storage queries.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

define_id! {
    /// Unique identifier for one live client attachment (socket or stream).
    ConnectionId
}

define_id! {
    /// Unique identifier for a chat channel.
    ChannelId
}

define_id! {
    /// Unique identifier for a persisted chat message.
    MessageId
}

define_id! {
    /// Unique identifier for a unit record.
    ///
    /// Units are addressed by call sign on the wire; this is the storage key.
    UnitId
}
