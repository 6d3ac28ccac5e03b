//! Chat `WebSocket` ingress.
//!
//! Clients connect to `GET /ws/ops/{operation}` with a credential in the
//! `token` query parameter or a `Bearer` header. The upgrade always
//! succeeds; the handshake then either authenticates the connection and
//! registers it with the hub, or closes it with a reason code:
//!
//! ```text
//! Connecting --(topic ok, token ok)--> Authenticated --> register
//!      |
//!      +--(no usable topic)--> Rejected(1007 bad data)
//!      +--(no usable token)--> Rejected(1003 not acceptable)
//! ```
//!
//! Each inbound text frame is a chat command. Frames that fail to parse
//! or to process produce an `error` frame for the sender only.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{OriginalUri, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::Response;
use cop_commands::Sender;
use cop_hub::{CloseReason, Connection, SocketConnection, SocketOutbound};
use cop_types::{ChatFrame, DomainEvent, StreamKind, TopicKey};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::auth::{Principal, TokenVerifier, extract_token};
use crate::state::AppState;

/// Path prefix the operation id follows.
pub const CHAT_PATH_PREFIX: &str = "/ws/ops";

/// Result of the connection handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handshake {
    /// Topic and credential are usable.
    Authenticated {
        /// Operation the socket joins.
        topic: TopicKey,
        /// Who is connecting.
        principal: Principal,
    },
    /// The socket must be closed with this reason; nothing is registered.
    Rejected(CloseReason),
}

/// The operation id from a chat socket path: exactly one non-empty
/// segment after [`CHAT_PATH_PREFIX`].
///
/// The segment is percent-decoded so `op%3A1` names the same topic the
/// REST and stream routes resolve through their path extractors.
pub fn extract_topic(path: &str) -> Option<TopicKey> {
    let rest = path.strip_prefix(CHAT_PATH_PREFIX)?.strip_prefix('/')?;
    let segment = urlencoding::decode(rest).ok()?;
    TopicKey::parse(&segment).ok()
}

/// Run the handshake. The topic is checked before the credential.
pub fn handshake(path: &str, token: Option<&str>, verifier: &dyn TokenVerifier) -> Handshake {
    let Some(topic) = extract_topic(path) else {
        return Handshake::Rejected(CloseReason::BadData);
    };
    match token.and_then(|t| verifier.verify(t)) {
        Some(principal) => Handshake::Authenticated { topic, principal },
        None => Handshake::Rejected(CloseReason::NotAcceptable),
    }
}

/// Upgrade to a `WebSocket` and run the chat session.
///
/// # Route
///
/// `GET /ws/ops/{operation}`
pub async fn chat_socket(
    ws: WebSocketUpgrade,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let token = extract_token(&uri, &headers);
    let outcome = handshake(uri.path(), token.as_deref(), state.verifier.as_ref());
    ws.on_upgrade(move |socket| run_session(socket, state, outcome))
}

fn close_message(reason: CloseReason) -> Message {
    Message::Close(Some(CloseFrame {
        code: reason.code(),
        reason: reason.label().into(),
    }))
}

async fn run_session(mut socket: WebSocket, state: Arc<AppState>, outcome: Handshake) {
    let (topic, principal) = match outcome {
        Handshake::Authenticated { topic, principal } => (topic, principal),
        Handshake::Rejected(reason) => {
            warn!(code = reason.code(), "Chat connection rejected");
            let _ = socket.send(close_message(reason)).await;
            return;
        }
    };

    let (connection, mut outlet) =
        SocketConnection::open(topic.clone(), state.streams.outbound_buffer);
    let connection = Arc::new(connection);
    let id = connection.id();
    if let Err(e) = state
        .hub
        .register(&topic, StreamKind::Chat, connection.clone())
    {
        warn!(operation = %topic, connection = %id, error = %e, "Chat registration failed");
        let _ = socket.send(close_message(CloseReason::ServerError)).await;
        return;
    }

    let (mut sink, mut source) = socket.split();
    let mut writer = tokio::spawn(async move {
        loop {
            match outlet.next().await {
                SocketOutbound::Frame(text) => {
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        outlet.shut(CloseReason::ServerError);
                        break;
                    }
                }
                SocketOutbound::Close(reason) => {
                    let _ = sink.send(close_message(reason)).await;
                    break;
                }
            }
        }
    });

    let sender = Sender {
        id: principal.subject,
        name: principal.display_name,
    };
    let mut writer_done = false;
    loop {
        tokio::select! {
            inbound = source.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    handle_text(&state, &topic, connection.as_ref(), &sender, &text).await;
                }
                Some(Ok(Message::Binary(_))) => {
                    reply_error(&topic, connection.as_ref(), "binary frames are not supported");
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!(operation = %topic, connection = %id, error = %e, "Chat transport error");
                    break;
                }
                Some(Ok(_)) => {}
            },
            _ = &mut writer => {
                writer_done = true;
                break;
            }
        }
    }

    state.hub.deregister(&topic, StreamKind::Chat, id);
    connection.close(CloseReason::Normal);
    if !writer_done {
        let _ = writer.await;
    }
    info!(operation = %topic, connection = %id, "Chat session ended");
}

async fn handle_text(
    state: &AppState,
    topic: &TopicKey,
    connection: &dyn Connection,
    sender: &Sender,
    text: &str,
) {
    let frame: ChatFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            reply_error(topic, connection, &e.to_string());
            return;
        }
    };
    if let Err(e) = state.chat.post_message(topic, &frame, sender).await {
        debug!(operation = %topic, connection = %connection.id(), error = %e, "Chat command failed");
        reply_error(topic, connection, &e.to_string());
    }
}

/// Queue an `error` frame for this connection only.
fn reply_error(topic: &TopicKey, connection: &dyn Connection, reason: &str) {
    let notice = DomainEvent::error_notice(topic, format!("Failed to process message: {reason}"));
    if let Err(e) = connection.send(&notice) {
        debug!(operation = %topic, connection = %connection.id(), error = %e, "Error frame not delivered");
        connection.close(CloseReason::ServerError);
    }
}
