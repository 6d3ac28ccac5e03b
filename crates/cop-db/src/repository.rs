//! Collaborator interfaces consumed by the command processors.
//!
//! The relay never talks to storage directly; it goes through these two
//! traits. [`crate::PgChatStore`] / [`crate::PgUnitStore`] implement them
//! over `PostgreSQL` and [`crate::InMemoryStore`] implements both for
//! development and tests.

use async_trait::async_trait;
use cop_types::{Channel, ChannelId, ChatMessage, NewChatMessage, TopicKey, Unit};

use crate::error::DbError;

/// Chat channels and messages.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// The operation's `GENERAL` channel, if one exists.
    async fn find_default_channel(&self, operation: &TopicKey) -> Result<Option<Channel>, DbError>;

    /// Find the operation's `GENERAL` channel, creating it when absent.
    async fn ensure_default_channel(
        &self,
        operation: &TopicKey,
        created_by: &str,
    ) -> Result<Channel, DbError>;

    /// Commit a message. Returns the stored record once the write is durable.
    async fn save_message(&self, message: NewChatMessage) -> Result<ChatMessage, DbError>;

    /// The newest `limit` messages of a channel, oldest first.
    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, DbError>;
}

/// Tracked units.
#[async_trait]
pub trait UnitRepository: Send + Sync {
    /// Look a unit up by its call sign.
    async fn find_by_call_sign(&self, call_sign: &str) -> Result<Option<Unit>, DbError>;

    /// Commit the unit's current state. Returns the stored record.
    async fn save_unit(&self, unit: Unit) -> Result<Unit, DbError>;
}
