//! Chat command processing: validate, resolve the default channel,
//! persist, then publish to the operation's chat subscribers.

use std::sync::Arc;

use cop_db::ChatRepository;
use cop_hub::{EventPublisher, PublishReport};
use cop_types::{Channel, ChatFrame, ChatMessage, DomainEvent, NewChatMessage, StreamKind, TopicKey};
use tracing::{info, warn};

use crate::error::CommandError;

/// Longest chat message body accepted, in characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Default number of messages returned by [`ChatCommandProcessor::history`].
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// Upper bound on a history request.
pub const MAX_HISTORY_LIMIT: u32 = 500;

/// Who a message is attributed to when the frame does not say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    /// User identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// Processes inbound chat commands for every operation.
pub struct ChatCommandProcessor {
    chat: Arc<dyn ChatRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl ChatCommandProcessor {
    /// Create a processor over a chat store and a publisher.
    pub fn new(chat: Arc<dyn ChatRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { chat, publisher }
    }

    /// Post the frame's content to the operation's default channel.
    ///
    /// The message is committed before it is published; any failure
    /// returns before the publisher is called.
    ///
    /// # Errors
    ///
    /// [`CommandError::Validation`] for blank or oversized content,
    /// [`CommandError::ChannelNotFound`] when the operation has no default
    /// channel, [`CommandError::Persistence`] when the store fails.
    pub async fn post_message(
        &self,
        topic: &TopicKey,
        frame: &ChatFrame,
        fallback: &Sender,
    ) -> Result<ChatMessage, CommandError> {
        let content = frame
            .non_empty_content()
            .ok_or_else(|| CommandError::Validation(String::from("content is required")))?;
        if content.chars().count() > MAX_CONTENT_CHARS {
            return Err(CommandError::Validation(format!(
                "content exceeds {MAX_CONTENT_CHARS} characters"
            )));
        }

        let channel = self
            .chat
            .find_default_channel(topic)
            .await?
            .ok_or_else(|| CommandError::ChannelNotFound(topic.clone()))?;

        let sender_id = frame.sender_id.clone().unwrap_or_else(|| fallback.id.clone());
        let sender_name = frame
            .sender_name
            .clone()
            .unwrap_or_else(|| fallback.name.clone());
        let saved = self
            .chat
            .save_message(NewChatMessage::text(
                channel.id,
                sender_id,
                sender_name,
                content.to_owned(),
            ))
            .await?;

        let report = self.publisher.publish(
            topic,
            StreamKind::Chat,
            &DomainEvent::chat_message(topic, saved.clone()),
        );
        info!(
            operation = %topic,
            message = %saved.id,
            delivered = report.delivered,
            "Chat message posted"
        );
        Ok(saved)
    }

    /// Announce `content` to every chat subscriber of the operation as a
    /// `system_message`. Nothing is persisted.
    pub fn broadcast_system_message(&self, topic: &TopicKey, content: &str) -> PublishReport {
        self.publisher.publish(
            topic,
            StreamKind::Chat,
            &DomainEvent::system_notice(topic, content),
        )
    }

    /// Find the operation's default channel, creating it if needed.
    ///
    /// # Errors
    ///
    /// [`CommandError::Persistence`] when the store fails.
    pub async fn ensure_channel(
        &self,
        topic: &TopicKey,
        created_by: &str,
    ) -> Result<Channel, CommandError> {
        let channel = self.chat.ensure_default_channel(topic, created_by).await?;
        info!(operation = %topic, channel = %channel.id, "Default channel ready");
        Ok(channel)
    }

    /// The most recent messages of the operation's default channel, oldest
    /// first. `limit` defaults to [`DEFAULT_HISTORY_LIMIT`] and is clamped
    /// to `1..=MAX_HISTORY_LIMIT`.
    ///
    /// # Errors
    ///
    /// [`CommandError::ChannelNotFound`] or [`CommandError::Persistence`].
    pub async fn history(
        &self,
        topic: &TopicKey,
        limit: Option<u32>,
    ) -> Result<Vec<ChatMessage>, CommandError> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        let Some(channel) = self.chat.find_default_channel(topic).await? else {
            warn!(operation = %topic, "History requested for operation without a channel");
            return Err(CommandError::ChannelNotFound(topic.clone()));
        };
        Ok(self.chat.recent_messages(channel.id, limit).await?)
    }
}
