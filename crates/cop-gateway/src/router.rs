//! Axum router construction for the relay.
//!
//! Assembles the chat socket, the SSE streams, and the REST endpoints
//! into a single [`Router`] with CORS and request tracing.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{chat_ws, handlers, stream_sse};

/// Build the complete Axum router.
///
/// - `GET /ws/ops/{operation}` -- chat `WebSocket`
/// - `GET /api/ops/{operation}/stream/{kind}` -- position / event SSE
/// - `POST /api/ops/{operation}/units/{unit}/position` -- position update
/// - `POST /api/ops/{operation}/events` -- operation event
/// - `POST /api/ops/{operation}/channels/default` -- default channel
/// - `GET /api/ops/{operation}/messages` -- chat history
/// - `GET /api/hub/stats` -- hub counters
///
/// Any other path under `/ws/ops` is still upgraded so the client gets
/// a close frame with a reason rather than a plain 404.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Chat
        .route("/ws/ops", get(chat_ws::chat_socket))
        .route("/ws/ops/{*rest}", get(chat_ws::chat_socket))
        // Streams
        .route(
            "/api/ops/{operation}/stream/{kind}",
            get(stream_sse::operation_stream),
        )
        // Commands
        .route(
            "/api/ops/{operation}/units/{unit}/position",
            post(handlers::update_position),
        )
        .route("/api/ops/{operation}/events", post(handlers::publish_event))
        .route(
            "/api/ops/{operation}/channels/default",
            post(handlers::ensure_default_channel),
        )
        .route("/api/ops/{operation}/messages", get(handlers::list_messages))
        // Hub
        .route("/api/hub/stats", get(handlers::hub_stats))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
