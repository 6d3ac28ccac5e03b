//! Shared application state for the gateway.
//!
//! [`AppState`] is built once at startup and injected into every handler
//! through Axum's `State` extractor. It owns handles to the broadcast
//! hub, both command processors, and the token verifier; nothing is
//! reachable through globals.

use std::sync::Arc;
use std::time::Duration;

use cop_commands::{ChatCommandProcessor, PositionCommandProcessor};
use cop_db::{ChatRepository, UnitRepository};
use cop_hub::{BroadcastHub, EventPublisher};

use crate::auth::{PermissiveTokenVerifier, TokenVerifier};

/// Limits applied to every connection the gateway creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    /// Hard lifetime of a server-push stream.
    pub max_lifetime: Duration,
    /// Interval between keep-alive comments on a server-push stream.
    pub keep_alive: Duration,
    /// Outbound queue capacity per connection. A full queue drops the
    /// connection.
    pub outbound_buffer: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            max_lifetime: Duration::from_secs(30 * 60),
            keep_alive: Duration::from_secs(15),
            outbound_buffer: 64,
        }
    }
}

/// Shared state for the Axum application.
pub struct AppState {
    /// Fan-out hub for all stream kinds.
    pub hub: Arc<BroadcastHub>,
    /// Chat command processor.
    pub chat: ChatCommandProcessor,
    /// Position and operation-event command processor.
    pub positions: PositionCommandProcessor,
    /// Credential check for the chat socket.
    pub verifier: Arc<dyn TokenVerifier>,
    /// Per-connection limits.
    pub streams: StreamSettings,
}

impl AppState {
    /// Wire the processors to `hub` over the given stores, with the
    /// permissive token verifier and default stream settings.
    pub fn new(
        hub: Arc<BroadcastHub>,
        chat: Arc<dyn ChatRepository>,
        units: Arc<dyn UnitRepository>,
    ) -> Self {
        let publisher: Arc<dyn EventPublisher> = hub.clone();
        Self {
            chat: ChatCommandProcessor::new(chat, Arc::clone(&publisher)),
            positions: PositionCommandProcessor::new(units, publisher),
            hub,
            verifier: Arc::new(PermissiveTokenVerifier),
            streams: StreamSettings::default(),
        }
    }

    /// Replace the token verifier.
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn TokenVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    /// Replace the stream settings.
    #[must_use]
    pub const fn with_streams(mut self, streams: StreamSettings) -> Self {
        self.streams = streams;
        self
    }
}
