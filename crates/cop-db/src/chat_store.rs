//! `PostgreSQL` implementation of [`ChatRepository`].
//!
//! Channels and messages live in the `channels` and `messages` tables.
//! Enumerations are stored as their upper-case text form and decoded on
//! read; an unknown value is a [`DbError::Decode`], never a panic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cop_types::{
    Channel, ChannelId, ChannelType, ChatMessage, MessageId, MessagePriority, MessageType,
    NewChatMessage, TopicKey,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::ChatRepository;

/// Name given to a channel created by [`ChatRepository::ensure_default_channel`].
pub const DEFAULT_CHANNEL_NAME: &str = "General";

/// Chat store over a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgChatStore {
    pool: PgPool,
}

impl PgChatStore {
    /// Create a store bound to `pool`.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRepository for PgChatStore {
    async fn find_default_channel(&self, operation: &TopicKey) -> Result<Option<Channel>, DbError> {
        let row = sqlx::query_as::<_, ChannelRow>(
            r"SELECT id, name, description, channel_type, operation_id, created_by, created_at
              FROM channels
              WHERE operation_id = $1 AND channel_type = $2
              ORDER BY created_at
              LIMIT 1",
        )
        .bind(operation.as_str())
        .bind(ChannelType::General.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Channel::try_from).transpose()
    }

    async fn ensure_default_channel(
        &self,
        operation: &TopicKey,
        created_by: &str,
    ) -> Result<Channel, DbError> {
        // The partial unique index makes concurrent creators converge on one row.
        sqlx::query(
            r"INSERT INTO channels (id, name, description, channel_type, operation_id, created_by)
              VALUES ($1, $2, NULL, $3, $4, $5)
              ON CONFLICT DO NOTHING",
        )
        .bind(ChannelId::new().into_inner())
        .bind(DEFAULT_CHANNEL_NAME)
        .bind(ChannelType::General.as_str())
        .bind(operation.as_str())
        .bind(created_by)
        .execute(&self.pool)
        .await?;

        self.find_default_channel(operation)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("general channel for operation {operation}")))
    }

    async fn save_message(&self, message: NewChatMessage) -> Result<ChatMessage, DbError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r"INSERT INTO messages (id, channel_id, sender_id, sender_name, content, message_type, priority)
              VALUES ($1, $2, $3, $4, $5, $6, $7)
              RETURNING id, channel_id, sender_id, sender_name, content, message_type, priority,
                        is_edited, edited_at, created_at",
        )
        .bind(MessageId::new().into_inner())
        .bind(message.channel_id.into_inner())
        .bind(&message.sender_id)
        .bind(&message.sender_name)
        .bind(&message.content)
        .bind(message.message_type.as_str())
        .bind(message.priority.as_str())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(channel = %message.channel_id, "Message committed");
        ChatMessage::try_from(row)
    }

    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, DbError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r"SELECT id, channel_id, sender_id, sender_name, content, message_type, priority,
                     is_edited, edited_at, created_at
              FROM (
                  SELECT * FROM messages
                  WHERE channel_id = $1
                  ORDER BY created_at DESC
                  LIMIT $2
              ) newest
              ORDER BY created_at ASC",
        )
        .bind(channel.into_inner())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ChatMessage::try_from).collect()
    }
}

/// A row from the `channels` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChannelRow {
    /// Channel ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Channel type as stored text.
    pub channel_type: String,
    /// Owning operation.
    pub operation_id: String,
    /// Creator.
    pub created_by: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ChannelRow> for Channel {
    type Error = DbError;

    fn try_from(row: ChannelRow) -> Result<Self, Self::Error> {
        let channel_type = ChannelType::parse(&row.channel_type)
            .ok_or_else(|| DbError::Decode(format!("unknown channel type {}", row.channel_type)))?;
        let operation_id = TopicKey::parse(&row.operation_id)
            .map_err(|e| DbError::Decode(format!("bad operation id on channel {}: {e}", row.id)))?;
        Ok(Self {
            id: ChannelId::from(row.id),
            name: row.name,
            description: row.description,
            channel_type,
            operation_id,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

/// A row from the `messages` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageRow {
    /// Message ID.
    pub id: Uuid,
    /// Channel ID.
    pub channel_id: Uuid,
    /// Sender ID.
    pub sender_id: String,
    /// Sender display name.
    pub sender_name: String,
    /// Body.
    pub content: String,
    /// Message type as stored text.
    pub message_type: String,
    /// Priority as stored text.
    pub priority: String,
    /// Edited flag.
    pub is_edited: bool,
    /// Last edit time.
    pub edited_at: Option<DateTime<Utc>>,
    /// Commit time.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for ChatMessage {
    type Error = DbError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let message_type = MessageType::parse(&row.message_type)
            .ok_or_else(|| DbError::Decode(format!("unknown message type {}", row.message_type)))?;
        let priority = MessagePriority::parse(&row.priority)
            .ok_or_else(|| DbError::Decode(format!("unknown priority {}", row.priority)))?;
        Ok(Self {
            id: MessageId::from(row.id),
            channel_id: ChannelId::from(row.channel_id),
            sender_id: row.sender_id,
            sender_name: row.sender_name,
            content: row.content,
            message_type,
            priority,
            is_edited: row.is_edited,
            edited_at: row.edited_at,
            created_at: row.created_at,
        })
    }
}
