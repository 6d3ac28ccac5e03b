//! HTTP surface of the COP real-time relay.
//!
//! This crate exposes:
//!
//! - **Chat `WebSocket`** (`/ws/ops/{operation}`) -- authenticated,
//!   bidirectional; inbound frames are chat commands
//! - **SSE streams** (`/api/ops/{operation}/stream/positions|events`) --
//!   server-push with a hard lifetime
//! - **REST commands** -- position updates, operation events, channel
//!   bootstrap, chat history, hub stats
//!
//! # Architecture
//!
//! Every connection is wrapped in a `cop_hub` adapter and registered
//! with the shared [`cop_hub::BroadcastHub`]. Commands go through the
//! `cop_commands` processors, which persist first and publish second.
//! All shared handles live in [`AppState`].

pub mod auth;
pub mod chat_ws;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod stream_sse;

// Re-export primary types for convenience.
pub use auth::{PermissiveTokenVerifier, Principal, TokenVerifier};
pub use error::GatewayError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, bind, serve_until, start_server};
pub use state::{AppState, StreamSettings};
