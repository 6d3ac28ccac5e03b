//! REST endpoint handlers.
//!
//! Every mutating endpoint goes through a command processor, so the
//! change is committed before anything is published.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/ops/{operation}/units/{unit}/position` | Move a unit, publish `position_update` |
//! | `POST` | `/api/ops/{operation}/events` | Publish a named operation event |
//! | `POST` | `/api/ops/{operation}/channels/default` | Find or create the default chat channel |
//! | `GET` | `/api/ops/{operation}/messages` | Recent chat history |
//! | `GET` | `/api/hub/stats` | Topic and connection counts per stream kind |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use cop_hub::{KindStats, PublishReport};
use cop_types::{Channel, ChatMessage, PositionUpdate, TopicKey, UnitPosition};
use serde::Deserialize;

use crate::error::GatewayError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request structs
// ---------------------------------------------------------------------------

/// Body of `POST /api/ops/{operation}/events`.
#[derive(Debug, Deserialize)]
pub struct OperationEventRequest {
    /// Server-push event name.
    pub event: String,
    /// Event payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Query parameters for `POST /api/ops/{operation}/channels/default`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelQuery {
    /// User recorded as the channel's creator (default `system`).
    pub created_by: Option<String>,
}

/// Query parameters for `GET /api/ops/{operation}/messages`.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Maximum number of messages (default 50, at most 500).
    pub limit: Option<u32>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Apply a position report to a unit and publish it.
///
/// Missing latitude or longitude is a 400 and nothing is written. An
/// unknown call sign is a 404.
pub async fn update_position(
    State(state): State<Arc<AppState>>,
    Path((operation, unit)): Path<(String, String)>,
    Json(update): Json<PositionUpdate>,
) -> Result<Json<UnitPosition>, GatewayError> {
    let topic = TopicKey::parse(&operation)?;
    let position = state
        .positions
        .update_position(&topic, &unit, &update)
        .await?;
    Ok(Json(position))
}

/// Publish a caller-named event to the operation's event stream.
pub async fn publish_event(
    State(state): State<Arc<AppState>>,
    Path(operation): Path<String>,
    Json(request): Json<OperationEventRequest>,
) -> Result<Json<PublishReport>, GatewayError> {
    let topic = TopicKey::parse(&operation)?;
    let report = state
        .positions
        .broadcast_operation_event(&topic, &request.event, request.data)?;
    Ok(Json(report))
}

/// Find or create the operation's default chat channel.
pub async fn ensure_default_channel(
    State(state): State<Arc<AppState>>,
    Path(operation): Path<String>,
    Query(query): Query<ChannelQuery>,
) -> Result<Json<Channel>, GatewayError> {
    let topic = TopicKey::parse(&operation)?;
    let created_by = query.created_by.as_deref().unwrap_or("system");
    let channel = state.chat.ensure_channel(&topic, created_by).await?;
    Ok(Json(channel))
}

/// Recent messages of the operation's default channel, oldest first.
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(operation): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<ChatMessage>>, GatewayError> {
    let topic = TopicKey::parse(&operation)?;
    let messages = state.chat.history(&topic, query.limit).await?;
    Ok(Json(messages))
}

/// Topic and connection counts per stream kind.
pub async fn hub_stats(State(state): State<Arc<AppState>>) -> Json<Vec<KindStats>> {
    Json(state.hub.stats())
}
