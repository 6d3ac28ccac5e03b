//! Persistence collaborators for the COP real-time relay.
//!
//! The command processors commit every state change here before the
//! broadcast hub sees it. Two backends implement the same traits:
//!
//! ```text
//! Command processor
//!     |
//!     +-- ChatRepository / UnitRepository (traits)
//!             |
//!             +-- PgChatStore / PgUnitStore --> PostgreSQL (PostgresPool)
//!             +-- InMemoryStore             --> process memory
//! ```
//!
//! # Modules
//!
//! - [`repository`] -- The collaborator traits
//! - [`postgres`] -- `PostgreSQL` pool and migrations
//! - [`chat_store`] -- Channels and messages over `PostgreSQL`
//! - [`unit_store`] -- Units over `PostgreSQL`
//! - [`memory`] -- Volatile implementation of both traits
//! - [`error`] -- Shared error type

pub mod chat_store;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod unit_store;

// Re-export primary types for convenience.
pub use chat_store::{ChannelRow, MessageRow, PgChatStore, DEFAULT_CHANNEL_NAME};
pub use error::DbError;
pub use memory::InMemoryStore;
pub use postgres::{PostgresConfig, PostgresPool};
pub use repository::{ChatRepository, UnitRepository};
pub use unit_store::{PgUnitStore, UnitRow};
