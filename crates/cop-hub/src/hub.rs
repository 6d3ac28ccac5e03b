//! The broadcast hub: one [`TopicRegistry`] per stream kind plus the
//! register / deregister / publish operations over them.
//!
//! The hub is constructed once at startup and shared by `Arc` with the
//! ingress handlers and command processors. It holds no global state.
//!
//! Failure handling is removal, never retry: any connection whose `send`
//! fails during a publish is deregistered and closed by that publish.

use std::sync::Arc;

use cop_types::{ConnectionId, DomainEvent, StreamKind, TopicKey};
use serde::Serialize;
use tracing::{debug, info};

use crate::connection::{CloseReason, Connection};
use crate::error::HubError;
use crate::registry::TopicRegistry;

/// Outcome of one publish call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    /// Connections in the snapshot.
    pub attempted: usize,
    /// Connections that accepted the event.
    pub delivered: usize,
    /// Connections removed because their send failed.
    pub pruned: usize,
}

/// Anything that can fan a domain event out to a topic.
///
/// Command processors depend on this rather than on [`BroadcastHub`]
/// directly so tests can observe (or forbid) publication.
pub trait EventPublisher: Send + Sync {
    /// Deliver `event` to every connection on `topic`/`kind`.
    fn publish(&self, topic: &TopicKey, kind: StreamKind, event: &DomainEvent) -> PublishReport;
}

/// Connection counts for one stream kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KindStats {
    /// Stream kind.
    pub kind: StreamKind,
    /// Topics with at least one connection.
    pub topics: usize,
    /// Live connections across those topics.
    pub connections: usize,
}

/// Fan-out hub for chat, position, and event streams.
#[derive(Default)]
pub struct BroadcastHub {
    chat: TopicRegistry,
    position: TopicRegistry,
    event: TopicRegistry,
}

impl BroadcastHub {
    /// Create a hub with empty registries.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry for `kind`.
    pub const fn registry(&self, kind: StreamKind) -> &TopicRegistry {
        match kind {
            StreamKind::Chat => &self.chat,
            StreamKind::Position => &self.position,
            StreamKind::Event => &self.event,
        }
    }

    /// Attach `connection` to `topic`/`kind`.
    ///
    /// The connection first receives a single `connected` acknowledgement
    /// carrying the topic key; only then does it become visible to
    /// publishers, so nothing published can overtake the acknowledgement.
    /// If the acknowledgement cannot be queued the connection is closed and
    /// never registered.
    ///
    /// # Errors
    ///
    /// [`HubError::Mismatch`] if the connection was created for another
    /// topic or kind; [`HubError::Handshake`] if the acknowledgement failed.
    pub fn register(
        &self,
        topic: &TopicKey,
        kind: StreamKind,
        connection: Arc<dyn Connection>,
    ) -> Result<(), HubError> {
        let info = connection.info();
        if info.topic != *topic || info.kind != kind {
            return Err(HubError::Mismatch {
                topic: topic.clone(),
                kind,
                actual_topic: info.topic.clone(),
                actual_kind: info.kind,
            });
        }
        let id = info.id;

        let ack = DomainEvent::connected(topic, kind);
        let mut failure = None;
        let admitted = self
            .registry(kind)
            .admit(topic, Arc::clone(&connection), |conn| match conn.send(&ack) {
                Ok(()) => true,
                Err(e) => {
                    failure = Some(e);
                    false
                }
            });

        if admitted {
            info!(operation = %topic, connection = %id, %kind, "Connection registered");
            return Ok(());
        }

        connection.close(CloseReason::ServerError);
        let cause = failure.unwrap_or(crate::error::SendError::Closed);
        debug!(operation = %topic, connection = %id, %kind, error = %cause, "Connection acknowledgement failed");
        Err(HubError::Handshake(cause))
    }

    /// Detach connection `id` from `topic`/`kind`.
    ///
    /// Idempotent: returns `false` when it was not registered. The topic
    /// entry is dropped when its last connection leaves. Does not close
    /// the connection; the caller owns the transport lifecycle.
    pub fn deregister(&self, topic: &TopicKey, kind: StreamKind, id: ConnectionId) -> bool {
        let removed = self.registry(kind).unsubscribe(topic, id).is_some();
        if removed {
            info!(operation = %topic, connection = %id, %kind, "Connection deregistered");
        }
        removed
    }

    /// Per-kind topic and connection counts.
    pub fn stats(&self) -> Vec<KindStats> {
        StreamKind::ALL
            .iter()
            .map(|&kind| {
                let registry = self.registry(kind);
                KindStats {
                    kind,
                    topics: registry.topic_count(),
                    connections: registry.total_connections(),
                }
            })
            .collect()
    }
}

impl EventPublisher for BroadcastHub {
    /// Deliver `event` to the snapshot of connections on `topic`/`kind`.
    ///
    /// Connections that fail are deregistered and closed before this
    /// returns. A topic with no connections is a cheap no-op.
    fn publish(&self, topic: &TopicKey, kind: StreamKind, event: &DomainEvent) -> PublishReport {
        let registry = self.registry(kind);
        let targets = registry.snapshot(topic);
        if targets.is_empty() {
            return PublishReport::default();
        }

        let mut report = PublishReport {
            attempted: targets.len(),
            ..PublishReport::default()
        };
        for connection in targets {
            match connection.send(event) {
                Ok(()) => report.delivered = report.delivered.saturating_add(1),
                Err(e) => {
                    debug!(
                        operation = %topic,
                        connection = %connection.id(),
                        %kind,
                        error = %e,
                        "Delivery failed, removing connection"
                    );
                    registry.unsubscribe(topic, connection.id());
                    connection.close(CloseReason::ServerError);
                    report.pruned = report.pruned.saturating_add(1);
                }
            }
        }

        debug!(
            operation = %topic,
            %kind,
            event = event.event_name(),
            delivered = report.delivered,
            pruned = report.pruned,
            "Event published"
        );
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use cop_types::EventPayload;

    use super::*;
    use crate::connection::ConnectionInfo;
    use crate::error::SendError;
    use crate::stream::StreamConnection;

    /// Records every event it accepts; can be told to fail.
    struct Recorder {
        info: ConnectionInfo,
        fail: AtomicBool,
        closed: Mutex<Option<CloseReason>>,
        received: Mutex<Vec<DomainEvent>>,
    }

    impl Recorder {
        fn new(topic: &TopicKey, kind: StreamKind) -> Arc<Self> {
            Arc::new(Self {
                info: ConnectionInfo::new(topic.clone(), kind),
                fail: AtomicBool::new(false),
                closed: Mutex::new(None),
                received: Mutex::new(Vec::new()),
            })
        }

        fn failing(self: &Arc<Self>) -> Arc<Self> {
            self.fail.store(true, Ordering::SeqCst);
            Arc::clone(self)
        }

        fn names(&self) -> Vec<String> {
            self.received
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.event_name().to_owned())
                .collect()
        }

        fn close_reason(&self) -> Option<CloseReason> {
            *self.closed.lock().unwrap()
        }
    }

    impl Connection for Recorder {
        fn info(&self) -> &ConnectionInfo {
            &self.info
        }

        fn send(&self, event: &DomainEvent) -> Result<(), SendError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(SendError::Closed);
            }
            self.received.lock().unwrap().push(event.clone());
            Ok(())
        }

        fn is_open(&self) -> bool {
            self.close_reason().is_none()
        }

        fn close(&self, reason: CloseReason) {
            self.closed.lock().unwrap().get_or_insert(reason);
        }
    }

    fn topic(raw: &str) -> TopicKey {
        TopicKey::parse(raw).unwrap()
    }

    #[test]
    fn register_sends_exactly_one_ack_first() {
        let hub = BroadcastHub::new();
        let op = topic("op-7");
        let conn = Recorder::new(&op, StreamKind::Position);
        hub.register(&op, StreamKind::Position, conn.clone()).unwrap();

        let update = DomainEvent::system_notice(&op, "moving");
        hub.publish(&op, StreamKind::Position, &update);

        assert_eq!(conn.names(), vec!["connected", "system_message"]);
        let first = conn.received.lock().unwrap()[0].clone();
        assert_eq!(first.topic, op);
        assert!(matches!(first.payload, EventPayload::Connected { .. }));
    }

    #[test]
    fn failed_ack_closes_and_does_not_register() {
        let hub = BroadcastHub::new();
        let op = topic("op-1");
        let conn = Recorder::new(&op, StreamKind::Chat).failing();

        let result = hub.register(&op, StreamKind::Chat, conn.clone());
        assert_eq!(result, Err(HubError::Handshake(SendError::Closed)));
        assert_eq!(conn.close_reason(), Some(CloseReason::ServerError));
        assert!(!hub.registry(StreamKind::Chat).has_topic(&op));
    }

    #[test]
    fn register_rejects_mismatched_topic_or_kind() {
        let hub = BroadcastHub::new();
        let op = topic("op-1");
        let conn = Recorder::new(&op, StreamKind::Chat);
        assert!(matches!(
            hub.register(&topic("op-2"), StreamKind::Chat, conn.clone()),
            Err(HubError::Mismatch { .. })
        ));
        assert!(matches!(
            hub.register(&op, StreamKind::Event, conn.clone()),
            Err(HubError::Mismatch { .. })
        ));
        assert!(conn.names().is_empty());
    }

    #[test]
    fn failing_connection_is_pruned_and_others_remain() {
        let hub = BroadcastHub::new();
        let op = topic("op-x");
        let conns: Vec<_> = (0..3).map(|_| Recorder::new(&op, StreamKind::Chat)).collect();
        for conn in &conns {
            hub.register(&op, StreamKind::Chat, conn.clone()).unwrap();
        }
        conns[1].failing();

        let report = hub.publish(&op, StreamKind::Chat, &DomainEvent::system_notice(&op, "check"));
        assert_eq!(
            report,
            PublishReport {
                attempted: 3,
                delivered: 2,
                pruned: 1
            }
        );

        let registry = hub.registry(StreamKind::Chat);
        assert!(registry.contains(&op, conns[0].id()));
        assert!(!registry.contains(&op, conns[1].id()));
        assert!(registry.contains(&op, conns[2].id()));
        assert_eq!(conns[1].close_reason(), Some(CloseReason::ServerError));
    }

    #[test]
    fn publish_to_empty_topic_is_a_no_op() {
        let hub = BroadcastHub::new();
        let report = hub.publish(
            &topic("op-none"),
            StreamKind::Event,
            &DomainEvent::system_notice(&topic("op-none"), "anyone?"),
        );
        assert_eq!(report, PublishReport::default());
        assert_eq!(hub.registry(StreamKind::Event).topic_count(), 0);
    }

    #[test]
    fn stream_kinds_are_isolated() {
        let hub = BroadcastHub::new();
        let op = topic("op-9");
        let chat = Recorder::new(&op, StreamKind::Chat);
        let position = Recorder::new(&op, StreamKind::Position);
        hub.register(&op, StreamKind::Chat, chat.clone()).unwrap();
        hub.register(&op, StreamKind::Position, position.clone()).unwrap();

        hub.publish(&op, StreamKind::Chat, &DomainEvent::system_notice(&op, "chat only"));
        assert_eq!(chat.names().len(), 2);
        assert_eq!(position.names(), vec!["connected"]);
    }

    #[test]
    fn deregister_twice_matches_deregister_once() {
        let hub = BroadcastHub::new();
        let op = topic("op-3");
        let a = Recorder::new(&op, StreamKind::Chat);
        let b = Recorder::new(&op, StreamKind::Chat);
        hub.register(&op, StreamKind::Chat, a.clone()).unwrap();
        hub.register(&op, StreamKind::Chat, b.clone()).unwrap();

        assert!(hub.deregister(&op, StreamKind::Chat, a.id()));
        let after_once = hub.registry(StreamKind::Chat).connection_count(&op);
        assert!(!hub.deregister(&op, StreamKind::Chat, a.id()));
        assert_eq!(hub.registry(StreamKind::Chat).connection_count(&op), after_once);

        assert!(hub.deregister(&op, StreamKind::Chat, b.id()));
        assert!(!hub.registry(StreamKind::Chat).has_topic(&op));
    }

    #[test]
    fn stats_count_per_kind() {
        let hub = BroadcastHub::new();
        let a = topic("op-a");
        let b = topic("op-b");
        hub.register(&a, StreamKind::Chat, Recorder::new(&a, StreamKind::Chat)).unwrap();
        hub.register(&b, StreamKind::Chat, Recorder::new(&b, StreamKind::Chat)).unwrap();
        hub.register(&a, StreamKind::Event, Recorder::new(&a, StreamKind::Event)).unwrap();

        let stats = hub.stats();
        let chat = stats.iter().find(|s| s.kind == StreamKind::Chat).unwrap();
        assert_eq!((chat.topics, chat.connections), (2, 2));
        let position = stats.iter().find(|s| s.kind == StreamKind::Position).unwrap();
        assert_eq!((position.topics, position.connections), (0, 0));
    }

    #[tokio::test]
    async fn dropped_stream_is_pruned_on_next_publish() {
        let hub = BroadcastHub::new();
        let op = topic("op-7");
        let (conn, outlet) =
            StreamConnection::open(op.clone(), StreamKind::Position, Duration::from_secs(60), 8);
        let conn: Arc<dyn Connection> = Arc::new(conn);
        hub.register(&op, StreamKind::Position, Arc::clone(&conn)).unwrap();

        drop(outlet);
        let report = hub.publish(&op, StreamKind::Position, &DomainEvent::system_notice(&op, "x"));
        assert_eq!(report.pruned, 1);
        assert!(!hub.registry(StreamKind::Position).has_topic(&op));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_register_publish_deregister_does_not_fault() {
        let hub = Arc::new(BroadcastHub::new());
        let op = topic("op-busy");

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let hub = Arc::clone(&hub);
            let op = op.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..50 {
                    let conn = Recorder::new(&op, StreamKind::Chat);
                    hub.register(&op, StreamKind::Chat, conn.clone()).unwrap();
                    hub.publish(&op, StreamKind::Chat, &DomainEvent::system_notice(&op, "tick"));
                    hub.deregister(&op, StreamKind::Chat, conn.id());
                    tokio::task::yield_now().await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert!(!hub.registry(StreamKind::Chat).has_topic(&op));
    }
}
