//! Connection adapter for server-push streams (positions, events).
//!
//! A stream is unidirectional and has a hard lifetime. The adapter queues
//! named [`PushEvent`]s; the [`StreamOutlet`] yields them to the HTTP
//! response body until the connection is closed or the deadline passes.

use std::sync::Arc;
use std::time::Duration;

use cop_types::{DomainEvent, StreamKind, TopicKey};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;

use crate::connection::{CloseReason, CloseSignal, Connection, ConnectionInfo};
use crate::error::SendError;

/// One named server-push event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    /// Event name (`connected`, `position_update`, or caller-supplied).
    pub name: String,
    /// Event body: plain text or JSON.
    pub data: String,
}

/// Hub-side handle for one server-push stream.
#[derive(Debug)]
pub struct StreamConnection {
    info: ConnectionInfo,
    events: mpsc::Sender<PushEvent>,
    signal: Arc<CloseSignal>,
    deadline: Instant,
}

/// Transport-side end of a [`StreamConnection`].
#[derive(Debug)]
pub struct StreamOutlet {
    events: mpsc::Receiver<PushEvent>,
    signal: Arc<CloseSignal>,
    deadline: Instant,
}

impl StreamConnection {
    /// Create a push stream adapter for `topic`/`kind` that expires after
    /// `lifetime`, with an outbound queue of `capacity` events.
    pub fn open(
        topic: TopicKey,
        kind: StreamKind,
        lifetime: Duration,
        capacity: usize,
    ) -> (Self, StreamOutlet) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let signal = Arc::new(CloseSignal::new());
        let now = Instant::now();
        // An unrepresentable lifetime expires immediately rather than never.
        let deadline = now.checked_add(lifetime).unwrap_or(now);
        let connection = Self {
            info: ConnectionInfo::new(topic, kind),
            events: tx,
            signal: Arc::clone(&signal),
            deadline,
        };
        let outlet = StreamOutlet {
            events: rx,
            signal,
            deadline,
        };
        (connection, outlet)
    }

    /// When the stream expires.
    pub const fn deadline(&self) -> Instant {
        self.deadline
    }
}

impl Connection for StreamConnection {
    fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    fn send(&self, event: &DomainEvent) -> Result<(), SendError> {
        if !self.is_open() {
            return Err(SendError::Closed);
        }
        let push = PushEvent {
            name: event.event_name().to_owned(),
            data: event.push_data()?,
        };
        self.events.try_send(push).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Full,
            TrySendError::Closed(_) => SendError::Closed,
        })
    }

    fn is_open(&self) -> bool {
        !self.signal.is_closed() && !self.events.is_closed() && Instant::now() < self.deadline
    }

    fn close(&self, reason: CloseReason) {
        self.signal.close(reason);
    }
}

impl StreamOutlet {
    /// Wait for the next event to push.
    ///
    /// Returns `None` when the stream is over: closed by the hub, every
    /// adapter handle dropped, or the lifetime elapsed (which also closes
    /// the adapter with [`CloseReason::Expired`]).
    pub async fn next(&mut self) -> Option<PushEvent> {
        tokio::select! {
            biased;
            _ = self.signal.closed() => None,
            () = tokio::time::sleep_until(self.deadline) => {
                self.signal.close(CloseReason::Expired);
                None
            }
            event = self.events.recv() => event,
        }
    }

    /// Why the stream ended, once it has.
    pub fn close_reason(&self) -> CloseReason {
        self.signal.reason()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cop_types::{UnitPosition, UnitStatus};

    use super::*;

    fn topic() -> TopicKey {
        TopicKey::parse("op-7").unwrap()
    }

    #[tokio::test]
    async fn position_event_is_pushed_as_json() {
        let (conn, mut outlet) =
            StreamConnection::open(topic(), StreamKind::Position, Duration::from_secs(60), 4);
        let position = UnitPosition {
            unit_id: String::from("ALPHA-1"),
            latitude: 1.0,
            longitude: 2.0,
            heading: None,
            speed: None,
            status: UnitStatus::Friendly,
            timestamp: chrono::Utc::now(),
        };
        conn.send(&DomainEvent::position_update(&topic(), position)).unwrap();

        let push = outlet.next().await.unwrap();
        assert_eq!(push.name, "position_update");
        let json: serde_json::Value = serde_json::from_str(&push.data).unwrap();
        assert_eq!(json["unitId"], "ALPHA-1");
    }

    #[tokio::test(start_paused = true)]
    async fn stream_expires_at_deadline() {
        let (conn, mut outlet) =
            StreamConnection::open(topic(), StreamKind::Event, Duration::from_secs(1800), 4);
        assert!(conn.is_open());

        tokio::time::advance(Duration::from_secs(1801)).await;
        assert!(outlet.next().await.is_none());
        assert_eq!(outlet.close_reason(), CloseReason::Expired);
        assert!(!conn.is_open());
        assert_eq!(
            conn.send(&DomainEvent::system_notice(&topic(), "late")),
            Err(SendError::Closed)
        );
    }

    #[tokio::test]
    async fn closing_ends_the_outlet() {
        let (conn, mut outlet) =
            StreamConnection::open(topic(), StreamKind::Event, Duration::from_secs(60), 4);
        conn.close(CloseReason::ServerError);
        assert!(outlet.next().await.is_none());
        assert_eq!(outlet.close_reason(), CloseReason::ServerError);
    }
}
