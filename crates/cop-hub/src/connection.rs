//! The transport-agnostic connection contract.
//!
//! The hub only ever sees `Arc<dyn Connection>`. Each transport provides
//! an adapter ([`crate::SocketConnection`] for the chat socket,
//! [`crate::StreamConnection`] for server-push streams) that renders a
//! [`DomainEvent`] in its own wire format and queues it for the
//! transport task. `send` never blocks and never performs I/O, so it is
//! safe to call while a registry shard is locked.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use cop_types::{ConnectionId, DomainEvent, StreamKind, TopicKey};
use tokio_util::sync::CancellationToken;

use crate::error::SendError;

/// Why a connection was closed. Maps onto `WebSocket` close codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseReason {
    /// Orderly shutdown.
    Normal,
    /// The request did not carry a usable topic key.
    BadData,
    /// The client presented no usable credential.
    NotAcceptable,
    /// A delivery failed or the server could not serve the connection.
    ServerError,
    /// The stream reached its maximum lifetime.
    Expired,
}

impl CloseReason {
    /// `WebSocket` close code for this reason.
    pub const fn code(self) -> u16 {
        match self {
            Self::Normal => 1000,
            Self::Expired => 1001,
            Self::NotAcceptable => 1003,
            Self::BadData => 1007,
            Self::ServerError => 1011,
        }
    }

    /// Short label sent as the close frame's reason text.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Expired => "expired",
            Self::NotAcceptable => "not acceptable",
            Self::BadData => "bad data",
            Self::ServerError => "server error",
        }
    }
}

/// Identity of one live attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Unique connection identifier.
    pub id: ConnectionId,
    /// Topic the connection is attached to.
    pub topic: TopicKey,
    /// Stream kind the connection is attached to.
    pub kind: StreamKind,
    /// When the connection was created.
    pub created_at: DateTime<Utc>,
}

impl ConnectionInfo {
    /// Identity for a new connection on `topic`/`kind`, stamped now.
    pub fn new(topic: TopicKey, kind: StreamKind) -> Self {
        Self {
            id: ConnectionId::new(),
            topic,
            kind,
            created_at: Utc::now(),
        }
    }
}

/// One-shot close latch shared by an adapter and its transport task.
///
/// The first `close` wins; later calls keep the original reason.
#[derive(Debug, Default)]
pub struct CloseSignal {
    token: CancellationToken,
    reason: OnceLock<CloseReason>,
}

impl CloseSignal {
    /// A latch that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the latch with `reason`.
    pub fn close(&self, reason: CloseReason) {
        let _ = self.reason.set(reason);
        self.token.cancel();
    }

    /// Whether the latch has fired.
    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The reason the latch fired with, or [`CloseReason::Normal`] if it
    /// has not fired.
    pub fn reason(&self) -> CloseReason {
        self.reason.get().copied().unwrap_or(CloseReason::Normal)
    }

    /// Wait until the latch fires and return its reason.
    pub async fn closed(&self) -> CloseReason {
        self.token.cancelled().await;
        self.reason()
    }
}

/// A live client attachment, as seen by the hub.
pub trait Connection: Send + Sync {
    /// Identity of the connection.
    fn info(&self) -> &ConnectionInfo;

    /// Queue `event` for delivery.
    ///
    /// Fails when the transport is closed, the outbound queue is full,
    /// or the event cannot be rendered. A failure is final: the caller
    /// removes the connection instead of retrying.
    fn send(&self, event: &DomainEvent) -> Result<(), SendError>;

    /// Whether the connection can still accept events.
    fn is_open(&self) -> bool;

    /// Close the connection. Idempotent; the first reason wins.
    fn close(&self, reason: CloseReason);

    /// Shorthand for `self.info().id`.
    fn id(&self) -> ConnectionId {
        self.info().id
    }
}
