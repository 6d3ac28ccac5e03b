//! Error types for the gateway's HTTP endpoints.
//!
//! [`GatewayError`] converts into an Axum response with a JSON body of
//! the form `{"error": "...", "status": 400}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cop_commands::CommandError;
use cop_types::TopicKeyError;

/// Errors returned by the REST and stream endpoints.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The request is malformed or fails validation.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The addressed resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The relay could not serve the request.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TopicKeyError> for GatewayError {
    fn from(e: TopicKeyError) -> Self {
        Self::BadRequest(format!("invalid operation id: {e}"))
    }
}

impl From<CommandError> for GatewayError {
    fn from(e: CommandError) -> Self {
        match e {
            CommandError::Validation(_) => Self::BadRequest(e.to_string()),
            CommandError::ChannelNotFound(_) | CommandError::UnitNotFound(_) => {
                Self::NotFound(e.to_string())
            }
            CommandError::Persistence(_) => Self::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
