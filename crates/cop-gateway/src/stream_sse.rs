//! Server-sent event ingress for position and operation-event streams.
//!
//! Opening the stream is the registration: the handler registers a
//! [`StreamConnection`] with the hub and returns an SSE body that drains
//! it. The first event is always `connected`.
//!
//! A [`StreamLease`] travels with the body. However the stream ends
//! (lifetime elapsed, hub closed it, client went away) the lease is
//! dropped exactly once and deregisters the connection.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use cop_hub::{BroadcastHub, CloseReason, Connection, StreamConnection, StreamOutlet};
use cop_types::{ConnectionId, StreamKind, TopicKey};
use futures::Stream;
use tracing::{info, warn};

use crate::error::GatewayError;
use crate::state::AppState;

/// Deregisters a stream connection when dropped.
pub struct StreamLease {
    hub: Arc<BroadcastHub>,
    connection: Arc<StreamConnection>,
    topic: TopicKey,
    kind: StreamKind,
}

impl StreamLease {
    /// Connection this lease covers.
    pub fn id(&self) -> ConnectionId {
        self.connection.id()
    }
}

impl Drop for StreamLease {
    fn drop(&mut self) {
        let id = self.connection.id();
        self.hub.deregister(&self.topic, self.kind, id);
        self.connection.close(CloseReason::Normal);
        info!(operation = %self.topic, connection = %id, kind = %self.kind, "Stream closed");
    }
}

/// Open a stream of `kind` for `topic`, register it, and return the
/// outlet with its lease.
///
/// # Errors
///
/// [`GatewayError::Internal`] if the `connected` acknowledgement cannot
/// be queued.
pub fn open_stream(
    state: &AppState,
    topic: TopicKey,
    kind: StreamKind,
) -> Result<(StreamOutlet, StreamLease), GatewayError> {
    let (connection, outlet) = StreamConnection::open(
        topic.clone(),
        kind,
        state.streams.max_lifetime,
        state.streams.outbound_buffer,
    );
    let connection = Arc::new(connection);
    state
        .hub
        .register(&topic, kind, connection.clone())
        .map_err(|e| {
            warn!(operation = %topic, %kind, error = %e, "Stream registration failed");
            GatewayError::Internal(e.to_string())
        })?;
    let lease = StreamLease {
        hub: Arc::clone(&state.hub),
        connection,
        topic,
        kind,
    };
    Ok((outlet, lease))
}

/// Turn an outlet into an SSE event stream that owns `lease`.
pub fn event_stream(
    outlet: StreamOutlet,
    lease: StreamLease,
) -> impl Stream<Item = Result<Event, Infallible>> {
    futures::stream::unfold((outlet, lease), |(mut outlet, lease)| async move {
        let push = outlet.next().await?;
        let event = Event::default().event(push.name).data(push.data);
        Some((Ok(event), (outlet, lease)))
    })
}

/// Subscribe to an operation's positions or events.
///
/// # Route
///
/// `GET /api/ops/{operation}/stream/{kind}` where `kind` is `positions`
/// or `events`.
pub async fn operation_stream(
    State(state): State<Arc<AppState>>,
    Path((operation, kind)): Path<(String, String)>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, GatewayError> {
    let topic = TopicKey::parse(&operation)?;
    let kind = StreamKind::from_stream_segment(&kind)
        .ok_or_else(|| GatewayError::BadRequest(format!("unknown stream kind: {kind}")))?;

    let (outlet, lease) = open_stream(&state, topic, kind)?;
    info!(operation = %operation, %kind, connection = %lease.id(), "Stream opened");

    Ok(Sse::new(event_stream(outlet, lease))
        .keep_alive(KeepAlive::new().interval(state.streams.keep_alive)))
}
