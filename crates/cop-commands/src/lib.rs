//! Domain command processors for the COP real-time relay.
//!
//! Each processor follows the same sequence: validate the command,
//! resolve the target through a repository, commit the change, build a
//! [`cop_types::DomainEvent`] from the committed record, and publish it.
//! A failure at any step before the publish returns a [`CommandError`]
//! and publishes nothing.
//!
//! # Modules
//!
//! - [`chat`] -- Chat messages, system notices, channel bootstrap, history
//! - [`position`] -- Unit positions and operation events
//! - [`error`] -- Command failures ([`CommandError`])

pub mod chat;
pub mod error;
pub mod position;

pub use chat::{
    ChatCommandProcessor, DEFAULT_HISTORY_LIMIT, MAX_CONTENT_CHARS, MAX_HISTORY_LIMIT, Sender,
};
pub use error::CommandError;
pub use position::PositionCommandProcessor;
