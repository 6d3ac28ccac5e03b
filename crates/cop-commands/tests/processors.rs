//! Integration tests for the command processors.
//!
//! The processors run against the in-memory store, or against stores
//! that fail on purpose, with a recording publisher in place of the hub
//! so every publish call can be counted.

#![allow(clippy::unwrap_used, clippy::panic, clippy::float_cmp, clippy::arithmetic_side_effects, clippy::indexing_slicing)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use cop_commands::{ChatCommandProcessor, CommandError, PositionCommandProcessor, Sender};
use cop_db::{ChatRepository, DbError, InMemoryStore, UnitRepository};
use cop_hub::{EventPublisher, PublishReport};
use cop_types::{
    Channel, ChannelId, ChatFrame, ChatMessage, DomainEvent, EventPayload, NewChatMessage,
    PositionUpdate, StreamKind, TopicKey, Unit, UnitId, UnitStatus,
};

/// Records every publish instead of delivering it.
#[derive(Default)]
struct RecordingPublisher {
    calls: Mutex<Vec<(TopicKey, StreamKind, DomainEvent)>>,
}

impl RecordingPublisher {
    fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn last(&self) -> (TopicKey, StreamKind, DomainEvent) {
        self.calls.lock().unwrap().last().cloned().unwrap()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, topic: &TopicKey, kind: StreamKind, event: &DomainEvent) -> PublishReport {
        self.calls
            .lock()
            .unwrap()
            .push((topic.clone(), kind, event.clone()));
        PublishReport::default()
    }
}

/// Resolves channels and units but rejects every write.
struct RejectingStore {
    inner: InMemoryStore,
    unit_writes: Mutex<usize>,
}

#[async_trait]
impl ChatRepository for RejectingStore {
    async fn find_default_channel(&self, operation: &TopicKey) -> Result<Option<Channel>, DbError> {
        self.inner.find_default_channel(operation).await
    }

    async fn ensure_default_channel(
        &self,
        operation: &TopicKey,
        created_by: &str,
    ) -> Result<Channel, DbError> {
        self.inner.ensure_default_channel(operation, created_by).await
    }

    async fn save_message(&self, _message: NewChatMessage) -> Result<ChatMessage, DbError> {
        Err(DbError::WriteRejected(String::from("disk full")))
    }

    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, DbError> {
        self.inner.recent_messages(channel, limit).await
    }
}

#[async_trait]
impl UnitRepository for RejectingStore {
    async fn find_by_call_sign(&self, call_sign: &str) -> Result<Option<Unit>, DbError> {
        self.inner.find_by_call_sign(call_sign).await
    }

    async fn save_unit(&self, _unit: Unit) -> Result<Unit, DbError> {
        *self.unit_writes.lock().unwrap() += 1;
        Err(DbError::WriteRejected(String::from("disk full")))
    }
}

fn topic(raw: &str) -> TopicKey {
    TopicKey::parse(raw).unwrap()
}

fn fallback() -> Sender {
    Sender {
        id: String::from("anonymous"),
        name: String::from("Anonymous"),
    }
}

fn content(text: &str) -> ChatFrame {
    ChatFrame {
        content: Some(String::from(text)),
        ..ChatFrame::default()
    }
}

fn unit(call_sign: &str) -> Unit {
    Unit {
        id: UnitId::new(),
        call_sign: String::from(call_sign),
        unit_type: String::from("infantry"),
        status: UnitStatus::Friendly,
        latitude: 0.0,
        longitude: 0.0,
        heading: None,
        speed: None,
        last_update: Utc::now(),
        commander_id: String::from("cmdr-1"),
    }
}

fn chat_fixture() -> (Arc<InMemoryStore>, Arc<RecordingPublisher>, ChatCommandProcessor) {
    let store = Arc::new(InMemoryStore::new());
    let publisher = Arc::new(RecordingPublisher::default());
    let processor = ChatCommandProcessor::new(store.clone(), publisher.clone());
    (store, publisher, processor)
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[tokio::test]
async fn post_message_persists_then_publishes_once() {
    let (store, publisher, processor) = chat_fixture();
    let op = topic("op-42");
    let channel = processor.ensure_channel(&op, "system").await.unwrap();

    let saved = processor
        .post_message(&op, &content("  status green "), &fallback())
        .await
        .unwrap();

    assert_eq!(saved.content, "status green");
    assert_eq!(saved.sender_id, "anonymous");
    assert_eq!(store.message_count(channel.id).await, 1);
    assert_eq!(publisher.count(), 1);

    let (published_topic, kind, event) = publisher.last();
    assert_eq!(published_topic, op);
    assert_eq!(kind, StreamKind::Chat);
    assert_eq!(event.payload, EventPayload::ChatMessage(saved));
}

#[tokio::test]
async fn frame_sender_overrides_fallback() {
    let (_, _, processor) = chat_fixture();
    let op = topic("op-1");
    processor.ensure_channel(&op, "system").await.unwrap();

    let frame = ChatFrame {
        sender_id: Some(String::from("u-7")),
        sender_name: Some(String::from("Bravo 6")),
        ..content("moving")
    };
    let saved = processor.post_message(&op, &frame, &fallback()).await.unwrap();
    assert_eq!(saved.sender_id, "u-7");
    assert_eq!(saved.sender_name, "Bravo 6");
}

#[tokio::test]
async fn blank_content_is_rejected_without_publish() {
    let (_, publisher, processor) = chat_fixture();
    let op = topic("op-1");
    processor.ensure_channel(&op, "system").await.unwrap();

    let result = processor.post_message(&op, &content("   "), &fallback()).await;
    assert!(matches!(result, Err(CommandError::Validation(_))));
    assert_eq!(publisher.count(), 0);
}

#[tokio::test]
async fn oversized_content_is_rejected() {
    let (_, publisher, processor) = chat_fixture();
    let op = topic("op-1");
    processor.ensure_channel(&op, "system").await.unwrap();

    let long = "x".repeat(cop_commands::MAX_CONTENT_CHARS + 1);
    let result = processor.post_message(&op, &content(&long), &fallback()).await;
    assert!(matches!(result, Err(CommandError::Validation(_))));
    assert_eq!(publisher.count(), 0);
}

#[tokio::test]
async fn missing_channel_aborts_before_publish() {
    let (_, publisher, processor) = chat_fixture();
    let result = processor
        .post_message(&topic("op-empty"), &content("hello"), &fallback())
        .await;
    assert!(matches!(result, Err(CommandError::ChannelNotFound(_))));
    assert_eq!(publisher.count(), 0);
}

#[tokio::test]
async fn chat_persistence_failure_publishes_nothing() {
    let store = Arc::new(RejectingStore {
        inner: InMemoryStore::new(),
        unit_writes: Mutex::new(0),
    });
    let publisher = Arc::new(RecordingPublisher::default());
    let processor = ChatCommandProcessor::new(store.clone(), publisher.clone());
    let op = topic("op-42");
    processor.ensure_channel(&op, "system").await.unwrap();

    let result = processor.post_message(&op, &content("status green"), &fallback()).await;
    assert!(matches!(
        result,
        Err(CommandError::Persistence(DbError::WriteRejected(_)))
    ));
    assert_eq!(publisher.count(), 0);
}

#[tokio::test]
async fn history_clamps_limit() {
    let (_, _, processor) = chat_fixture();
    let op = topic("op-1");
    processor.ensure_channel(&op, "system").await.unwrap();
    for n in 0..3 {
        processor
            .post_message(&op, &content(&format!("m{n}")), &fallback())
            .await
            .unwrap();
    }

    let all = processor.history(&op, None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].content, "m0");

    let one = processor.history(&op, Some(0)).await.unwrap();
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].content, "m2");
}

#[tokio::test]
async fn system_message_goes_to_chat_stream() {
    let (_, publisher, processor) = chat_fixture();
    let op = topic("op-3");
    processor.broadcast_system_message(&op, "net check at 1400");

    let (_, kind, event) = publisher.last();
    assert_eq!(kind, StreamKind::Chat);
    assert_eq!(event.event_name(), "system_message");
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

#[tokio::test]
async fn latitude_without_longitude_is_rejected_before_any_write() {
    let store = Arc::new(RejectingStore {
        inner: InMemoryStore::new(),
        unit_writes: Mutex::new(0),
    });
    store.inner.seed_unit(unit("ALPHA-1")).await;
    let publisher = Arc::new(RecordingPublisher::default());
    let processor = PositionCommandProcessor::new(store.clone(), publisher.clone());

    let update = PositionUpdate {
        latitude: Some(34.05),
        ..PositionUpdate::default()
    };
    let result = processor.update_position(&topic("op-7"), "ALPHA-1", &update).await;

    match result {
        Err(CommandError::Validation(reason)) => assert!(reason.contains("longitude")),
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert_eq!(*store.unit_writes.lock().unwrap(), 0);
    assert_eq!(publisher.count(), 0);
}

#[tokio::test]
async fn unit_persistence_failure_publishes_nothing() {
    let store = Arc::new(RejectingStore {
        inner: InMemoryStore::new(),
        unit_writes: Mutex::new(0),
    });
    store.inner.seed_unit(unit("ALPHA-1")).await;
    let publisher = Arc::new(RecordingPublisher::default());
    let processor = PositionCommandProcessor::new(store.clone(), publisher.clone());

    let update = PositionUpdate {
        latitude: Some(34.05),
        longitude: Some(-118.25),
        ..PositionUpdate::default()
    };
    let result = processor.update_position(&topic("op-7"), "ALPHA-1", &update).await;
    assert!(matches!(result, Err(CommandError::Persistence(_))));
    assert_eq!(*store.unit_writes.lock().unwrap(), 1);
    assert_eq!(publisher.count(), 0);
}

#[tokio::test]
async fn unknown_unit_is_not_found() {
    let store = Arc::new(InMemoryStore::new());
    let publisher = Arc::new(RecordingPublisher::default());
    let processor = PositionCommandProcessor::new(store, publisher.clone());

    let update = PositionUpdate {
        latitude: Some(1.0),
        longitude: Some(2.0),
        ..PositionUpdate::default()
    };
    let result = processor.update_position(&topic("op-7"), "GHOST", &update).await;
    assert!(matches!(result, Err(CommandError::UnitNotFound(ref c)) if c == "GHOST"));
    assert_eq!(publisher.count(), 0);
}

#[tokio::test]
async fn position_update_persists_and_publishes() {
    let store = Arc::new(InMemoryStore::new());
    store.seed_unit(unit("ALPHA-1")).await;
    let publisher = Arc::new(RecordingPublisher::default());
    let processor = PositionCommandProcessor::new(store.clone(), publisher.clone());

    let update = PositionUpdate {
        latitude: Some(34.05),
        longitude: Some(-118.25),
        heading: Some(90.0),
        speed: None,
    };
    let position = processor
        .update_position(&topic("op-7"), "ALPHA-1", &update)
        .await
        .unwrap();

    assert_eq!(position.unit_id, "ALPHA-1");
    let stored = store.find_by_call_sign("ALPHA-1").await.unwrap().unwrap();
    assert!((stored.latitude - 34.05).abs() < f64::EPSILON);
    assert_eq!(stored.heading, Some(90.0));

    let (_, kind, event) = publisher.last();
    assert_eq!(kind, StreamKind::Position);
    assert_eq!(event.payload, EventPayload::PositionUpdate(position));
}

#[tokio::test]
async fn operation_event_uses_caller_name() {
    let publisher = Arc::new(RecordingPublisher::default());
    let processor = PositionCommandProcessor::new(Arc::new(InMemoryStore::new()), publisher.clone());
    let op = topic("op-9");

    processor
        .broadcast_operation_event(&op, "phase_change", serde_json::json!({"phase": 2}))
        .unwrap();
    let (_, kind, event) = publisher.last();
    assert_eq!(kind, StreamKind::Event);
    assert_eq!(event.event_name(), "phase_change");

    let bad = processor.broadcast_operation_event(&op, "two\nlines", serde_json::Value::Null);
    assert!(matches!(bad, Err(CommandError::Validation(_))));
    assert_eq!(publisher.count(), 1);
}

#[tokio::test]
async fn reserved_event_names_are_rejected() {
    let publisher = Arc::new(RecordingPublisher::default());
    let processor = PositionCommandProcessor::new(Arc::new(InMemoryStore::new()), publisher.clone());
    let op = topic("op-9");

    for name in ["connected", "position_update", " connected ", "new_message"] {
        let result = processor.broadcast_operation_event(&op, name, serde_json::Value::Null);
        assert!(
            matches!(result, Err(CommandError::Validation(_))),
            "{name} accepted"
        );
    }
    assert_eq!(publisher.count(), 0);
}
