//! Connection adapter for the bidirectional chat socket.
//!
//! [`SocketConnection::open`] returns the adapter (handed to the hub) and
//! a [`SocketOutlet`] (owned by the socket's writer task). Events are
//! rendered as JSON [`cop_types::ChatFrame`] text and queued on a bounded
//! channel; the writer drains it onto the wire.

use std::sync::Arc;

use cop_types::{DomainEvent, StreamKind, TopicKey};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::connection::{CloseReason, CloseSignal, Connection, ConnectionInfo};
use crate::error::SendError;

/// What the writer task should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketOutbound {
    /// Write a text frame.
    Frame(String),
    /// Send a close frame with this reason and stop.
    Close(CloseReason),
}

/// Hub-side handle for one chat socket.
#[derive(Debug)]
pub struct SocketConnection {
    info: ConnectionInfo,
    frames: mpsc::Sender<String>,
    signal: Arc<CloseSignal>,
}

/// Transport-side end of a [`SocketConnection`].
#[derive(Debug)]
pub struct SocketOutlet {
    frames: mpsc::Receiver<String>,
    signal: Arc<CloseSignal>,
}

impl SocketConnection {
    /// Create a chat socket adapter for `topic` with an outbound queue of
    /// `capacity` frames.
    pub fn open(topic: TopicKey, capacity: usize) -> (Self, SocketOutlet) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let signal = Arc::new(CloseSignal::new());
        let connection = Self {
            info: ConnectionInfo::new(topic, StreamKind::Chat),
            frames: tx,
            signal: Arc::clone(&signal),
        };
        (connection, SocketOutlet { frames: rx, signal })
    }
}

impl Connection for SocketConnection {
    fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    fn send(&self, event: &DomainEvent) -> Result<(), SendError> {
        if !self.is_open() {
            return Err(SendError::Closed);
        }
        let frame = event.to_chat_frame()?;
        let text = serde_json::to_string(&frame)?;
        self.frames.try_send(text).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Full,
            TrySendError::Closed(_) => SendError::Closed,
        })
    }

    fn is_open(&self) -> bool {
        !self.signal.is_closed() && !self.frames.is_closed()
    }

    fn close(&self, reason: CloseReason) {
        self.signal.close(reason);
    }
}

impl SocketOutlet {
    /// Wait for the next thing to write.
    ///
    /// Returns [`SocketOutbound::Close`] once the connection is closed, or
    /// when every adapter handle has been dropped.
    pub async fn next(&mut self) -> SocketOutbound {
        tokio::select! {
            biased;
            reason = self.signal.closed() => SocketOutbound::Close(reason),
            frame = self.frames.recv() => match frame {
                Some(text) => SocketOutbound::Frame(text),
                None => SocketOutbound::Close(CloseReason::Normal),
            },
        }
    }

    /// Mark the connection closed from the transport side (peer went away
    /// or a write failed). Later sends through the adapter fail.
    pub fn shut(&self, reason: CloseReason) {
        self.signal.close(reason);
    }
}
