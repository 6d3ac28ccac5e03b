//! In-memory implementation of both repository traits.
//!
//! Used when the server runs with `storage.backend: memory` and by tests
//! that need a real store without `PostgreSQL`. Writes are committed as
//! soon as the lock is released; nothing survives a restart.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use cop_types::{
    Channel, ChannelId, ChannelType, ChatMessage, MessageId, NewChatMessage, TopicKey, Unit,
};
use tokio::sync::RwLock;

use crate::chat_store::DEFAULT_CHANNEL_NAME;
use crate::error::DbError;
use crate::repository::{ChatRepository, UnitRepository};

#[derive(Debug, Default)]
struct MemoryState {
    channels: Vec<Channel>,
    messages: Vec<ChatMessage>,
    units: BTreeMap<String, Unit>,
}

/// Volatile store for channels, messages, and units.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a unit, keyed by call sign.
    pub async fn seed_unit(&self, unit: Unit) {
        let mut state = self.state.write().await;
        state.units.insert(unit.call_sign.clone(), unit);
    }

    /// Number of messages committed to `channel`.
    pub async fn message_count(&self, channel: ChannelId) -> usize {
        let state = self.state.read().await;
        state
            .messages
            .iter()
            .filter(|m| m.channel_id == channel)
            .count()
    }
}

fn general_channel<'a>(channels: &'a [Channel], operation: &TopicKey) -> Option<&'a Channel> {
    channels
        .iter()
        .find(|c| c.channel_type == ChannelType::General && &c.operation_id == operation)
}

#[async_trait]
impl ChatRepository for InMemoryStore {
    async fn find_default_channel(&self, operation: &TopicKey) -> Result<Option<Channel>, DbError> {
        let state = self.state.read().await;
        Ok(general_channel(&state.channels, operation).cloned())
    }

    async fn ensure_default_channel(
        &self,
        operation: &TopicKey,
        created_by: &str,
    ) -> Result<Channel, DbError> {
        let mut state = self.state.write().await;
        if let Some(existing) = general_channel(&state.channels, operation) {
            return Ok(existing.clone());
        }
        let channel = Channel {
            id: ChannelId::new(),
            name: String::from(DEFAULT_CHANNEL_NAME),
            description: None,
            channel_type: ChannelType::General,
            operation_id: operation.clone(),
            created_by: created_by.to_owned(),
            created_at: Utc::now(),
        };
        state.channels.push(channel.clone());
        Ok(channel)
    }

    async fn save_message(&self, message: NewChatMessage) -> Result<ChatMessage, DbError> {
        let mut state = self.state.write().await;
        if !state.channels.iter().any(|c| c.id == message.channel_id) {
            return Err(DbError::NotFound(format!("channel {}", message.channel_id)));
        }
        let stored = ChatMessage {
            id: MessageId::new(),
            channel_id: message.channel_id,
            sender_id: message.sender_id,
            sender_name: message.sender_name,
            content: message.content,
            message_type: message.message_type,
            priority: message.priority,
            is_edited: false,
            edited_at: None,
            created_at: Utc::now(),
        };
        state.messages.push(stored.clone());
        Ok(stored)
    }

    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, DbError> {
        let state = self.state.read().await;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let mut newest: Vec<ChatMessage> = state
            .messages
            .iter()
            .rev()
            .filter(|m| m.channel_id == channel)
            .take(limit)
            .cloned()
            .collect();
        newest.reverse();
        Ok(newest)
    }
}

#[async_trait]
impl UnitRepository for InMemoryStore {
    async fn find_by_call_sign(&self, call_sign: &str) -> Result<Option<Unit>, DbError> {
        let state = self.state.read().await;
        Ok(state.units.get(call_sign).cloned())
    }

    async fn save_unit(&self, unit: Unit) -> Result<Unit, DbError> {
        let mut state = self.state.write().await;
        state.units.insert(unit.call_sign.clone(), unit.clone());
        Ok(unit)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cop_types::{UnitId, UnitStatus};

    use super::*;

    fn topic(raw: &str) -> TopicKey {
        TopicKey::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn ensure_default_channel_is_idempotent() {
        let store = InMemoryStore::new();
        let op = topic("op-42");
        assert!(store.find_default_channel(&op).await.unwrap().is_none());

        let first = store.ensure_default_channel(&op, "system").await.unwrap();
        let second = store.ensure_default_channel(&op, "someone-else").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.created_by, "system");
        assert_eq!(
            store.find_default_channel(&op).await.unwrap().map(|c| c.id),
            Some(first.id)
        );
    }

    #[tokio::test]
    async fn save_message_requires_known_channel() {
        let store = InMemoryStore::new();
        let orphan = NewChatMessage::text(
            ChannelId::new(),
            String::from("u-1"),
            String::from("Alpha"),
            String::from("hello"),
        );
        assert!(matches!(store.save_message(orphan).await, Err(DbError::NotFound(_))));
    }

    #[tokio::test]
    async fn recent_messages_returns_newest_oldest_first() {
        let store = InMemoryStore::new();
        let channel = store.ensure_default_channel(&topic("op-1"), "system").await.unwrap();
        for n in 0..5 {
            let message = NewChatMessage::text(
                channel.id,
                String::from("u-1"),
                String::from("Alpha"),
                format!("msg {n}"),
            );
            store.save_message(message).await.unwrap();
        }

        let recent = store.recent_messages(channel.id, 3).await.unwrap();
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["msg 2", "msg 3", "msg 4"]);
        assert_eq!(store.message_count(channel.id).await, 5);
    }

    #[tokio::test]
    async fn units_are_keyed_by_call_sign() {
        let store = InMemoryStore::new();
        let unit = Unit {
            id: UnitId::new(),
            call_sign: String::from("ALPHA-1"),
            unit_type: String::from("armor"),
            status: UnitStatus::Friendly,
            latitude: 1.0,
            longitude: 2.0,
            heading: None,
            speed: None,
            last_update: Utc::now(),
            commander_id: String::from("cdr"),
        };
        store.seed_unit(unit.clone()).await;
        let found = store.find_by_call_sign("ALPHA-1").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(unit.id));
        assert!(store.find_by_call_sign("ALPHA-2").await.unwrap().is_none());
    }
}
