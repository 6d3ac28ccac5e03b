//! Topic registry: topic key -> live connections, for one stream kind.
//!
//! Pure bookkeeping, no I/O. Backed by a sharded [`DashMap`] so
//! subscribes to different topics do not contend on a single lock. A
//! topic entry exists if and only if it holds at least one connection:
//! the last unsubscribe removes the entry under the same shard lock.
//!
//! Publishers never iterate the authoritative map. They take a
//! [`TopicRegistry::snapshot`] (a copy of the `Arc`s) and mutate the
//! registry afterwards, so a concurrent subscribe or unsubscribe can
//! never be observed half-applied.

use std::collections::HashMap;
use std::sync::Arc;

use cop_types::{ConnectionId, TopicKey};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::connection::Connection;

type Members = HashMap<ConnectionId, Arc<dyn Connection>>;

/// Live connections grouped by topic.
#[derive(Default)]
pub struct TopicRegistry {
    topics: DashMap<TopicKey, Members>,
}

impl TopicRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `connection` under `topic`. Re-adding the same connection ID
    /// replaces the previous handle.
    pub fn subscribe(&self, topic: &TopicKey, connection: Arc<dyn Connection>) {
        self.admit(topic, connection, |_| true);
    }

    /// Add `connection` under `topic` only if `gate` accepts it.
    ///
    /// `gate` runs while the topic's shard is write-locked, so anything it
    /// does happens-before the connection becomes visible to publishers.
    /// It must not block. A rejected connection leaves no trace, not even
    /// an empty topic entry. Returns whether the connection was added.
    pub fn admit<F>(&self, topic: &TopicKey, connection: Arc<dyn Connection>, gate: F) -> bool
    where
        F: FnOnce(&dyn Connection) -> bool,
    {
        match self.topics.entry(topic.clone()) {
            Entry::Occupied(mut occupied) => {
                if !gate(connection.as_ref()) {
                    return false;
                }
                occupied.get_mut().insert(connection.id(), connection);
            }
            Entry::Vacant(vacant) => {
                if !gate(connection.as_ref()) {
                    return false;
                }
                let mut members = Members::new();
                members.insert(connection.id(), connection);
                vacant.insert(members);
            }
        }
        true
    }

    /// Remove connection `id` from `topic`. Returns the removed handle, or
    /// `None` if it was not registered (a no-op). Drops the topic entry
    /// when it becomes empty.
    pub fn unsubscribe(&self, topic: &TopicKey, id: ConnectionId) -> Option<Arc<dyn Connection>> {
        match self.topics.entry(topic.clone()) {
            Entry::Occupied(mut occupied) => {
                let removed = occupied.get_mut().remove(&id);
                if occupied.get().is_empty() {
                    occupied.remove();
                }
                removed
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Copy of the connections currently registered under `topic`.
    ///
    /// Order is unspecified; delivery is fan-out, not sequenced.
    pub fn snapshot(&self, topic: &TopicKey) -> Vec<Arc<dyn Connection>> {
        self.topics
            .get(topic)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether connection `id` is registered under `topic`.
    pub fn contains(&self, topic: &TopicKey, id: ConnectionId) -> bool {
        self.topics
            .get(topic)
            .is_some_and(|members| members.contains_key(&id))
    }

    /// Whether `topic` has an entry (i.e. at least one connection).
    pub fn has_topic(&self, topic: &TopicKey) -> bool {
        self.topics.contains_key(topic)
    }

    /// Number of connections under `topic`.
    pub fn connection_count(&self, topic: &TopicKey) -> usize {
        self.topics.get(topic).map_or(0, |members| members.len())
    }

    /// Number of topics with at least one connection.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Number of connections across all topics.
    pub fn total_connections(&self) -> usize {
        self.topics.iter().map(|entry| entry.value().len()).sum()
    }
}
