//! Real-time fan-out for the COP relay.
//!
//! Clients attach to an operation (the topic) on one of three stream
//! kinds. The hub keeps a registry per kind and delivers each published
//! [`cop_types::DomainEvent`] to every connection on the matching
//! topic, pruning connections whose delivery fails.
//!
//! # Modules
//!
//! - [`connection`] -- The `Connection` contract and close signalling
//! - [`socket`] -- Adapter for the bidirectional chat socket
//! - [`stream`] -- Adapter for server-push event streams
//! - [`registry`] -- Topic key -> connections bookkeeping
//! - [`hub`] -- Register, deregister, publish
//! - [`error`] -- Send and registration errors

pub mod connection;
pub mod error;
pub mod hub;
pub mod registry;
pub mod socket;
pub mod stream;

pub use connection::{CloseReason, CloseSignal, Connection, ConnectionInfo};
pub use error::{HubError, SendError};
pub use hub::{BroadcastHub, EventPublisher, KindStats, PublishReport};
pub use registry::TopicRegistry;
pub use socket::{SocketConnection, SocketOutbound, SocketOutlet};
pub use stream::{PushEvent, StreamConnection, StreamOutlet};
