//! Topic keys: the operation identifier that scopes live connections.
//!
//! A topic key is an opaque token. It must be non-empty, at most
//! [`MAX_TOPIC_LEN`] bytes, and free of `/`, whitespace, and control
//! characters so it always fits in a single URL path segment. UUIDs are
//! valid keys, but so are tokens like `op-42`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Longest accepted topic key, in bytes.
pub const MAX_TOPIC_LEN: usize = 128;

/// Reasons a raw string is not a usable topic key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopicKeyError {
    /// The key was empty.
    #[error("topic key is empty")]
    Empty,

    /// The key exceeded [`MAX_TOPIC_LEN`].
    #[error("topic key is longer than {MAX_TOPIC_LEN} bytes")]
    TooLong,

    /// The key contained a `/`, whitespace, or a control character.
    #[error("topic key contains an invalid character: {0:?}")]
    InvalidChar(char),
}

/// Identifier of an operation, used as the fan-out topic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(try_from = "String", into = "String")]
#[ts(export, export_to = "bindings/")]
pub struct TopicKey(String);

impl TopicKey {
    /// Validate and wrap a raw topic string.
    pub fn parse(raw: &str) -> Result<Self, TopicKeyError> {
        if raw.is_empty() {
            return Err(TopicKeyError::Empty);
        }
        if raw.len() > MAX_TOPIC_LEN {
            return Err(TopicKeyError::TooLong);
        }
        if let Some(c) = raw
            .chars()
            .find(|c| *c == '/' || c.is_whitespace() || c.is_control())
        {
            return Err(TopicKeyError::InvalidChar(c));
        }
        Ok(Self(raw.to_owned()))
    }

    /// Borrow the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for TopicKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl core::str::FromStr for TopicKey {
    type Err = TopicKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TopicKey {
    type Error = TopicKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TopicKey> for String {
    fn from(key: TopicKey) -> Self {
        key.0
    }
}
