//! Error types for the broadcast hub and its connection adapters.

use cop_types::{StreamKind, TopicKey};

/// Why a single delivery attempt failed.
///
/// Any variant means the connection is no longer eligible for delivery;
/// the observer of the failure removes it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The transport is closed, or the connection was closed locally.
    #[error("connection closed")]
    Closed,

    /// The outbound queue is full. Slow consumers are dropped, not throttled.
    #[error("outbound queue full")]
    Full,

    /// The event could not be rendered for this transport.
    #[error("encode failed: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for SendError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encode(e.to_string())
    }
}

/// Errors returned by [`crate::BroadcastHub::register`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    /// The connection was built for a different topic or stream kind.
    #[error("connection belongs to {actual_kind}/{actual_topic}, not {kind}/{topic}")]
    Mismatch {
        /// Topic passed to `register`.
        topic: TopicKey,
        /// Stream kind passed to `register`.
        kind: StreamKind,
        /// Topic the connection was created for.
        actual_topic: TopicKey,
        /// Stream kind the connection was created for.
        actual_kind: StreamKind,
    },

    /// The `connected` acknowledgement could not be delivered. The
    /// connection has been closed and was never visible to publishers.
    #[error("connection acknowledgement failed: {0}")]
    Handshake(SendError),
}
