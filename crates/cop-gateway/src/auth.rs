//! Credential extraction and verification for the chat socket.
//!
//! The relay locates a bearer credential but does not validate it here.
//! [`PermissiveTokenVerifier`] accepts any non-empty token. It is a
//! placeholder: signature and claim checks belong in a real
//! [`TokenVerifier`] plugged into [`crate::AppState`].

use axum::extract::Query;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Uri};
use serde::Deserialize;

/// Identity attached to an authenticated connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Stable user identifier.
    pub subject: String,
    /// Human-readable name.
    pub display_name: String,
}

impl Principal {
    /// The identity used when the credential carries no claims.
    pub fn anonymous() -> Self {
        Self {
            subject: String::from("anonymous"),
            display_name: String::from("Anonymous"),
        }
    }
}

/// Turns a bearer credential into a [`Principal`].
pub trait TokenVerifier: Send + Sync {
    /// The principal for `token`, or `None` to reject the connection.
    fn verify(&self, token: &str) -> Option<Principal>;
}

/// Accepts every non-empty token as [`Principal::anonymous`].
///
/// WARNING: performs no verification at all. Replace before exposing the
/// relay outside a trusted network.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveTokenVerifier;

impl TokenVerifier for PermissiveTokenVerifier {
    fn verify(&self, token: &str) -> Option<Principal> {
        (!token.is_empty()).then(Principal::anonymous)
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Locate the credential: the `token` query parameter if present,
/// otherwise a `Bearer` `Authorization` header.
pub fn extract_token(uri: &Uri, headers: &HeaderMap) -> Option<String> {
    if let Some(token) = Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.token)
    {
        return Some(token);
    }
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned)
}
