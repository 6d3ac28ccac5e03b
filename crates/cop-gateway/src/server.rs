//! Listener and shutdown for the relay.
//!
//! [`bind`] and [`serve_until`] are split so callers (and tests) can bind
//! an ephemeral port and supply their own shutdown signal; the binary uses
//! [`start_server`], which stops on `Ctrl-C`.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Listen address for the relay.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port to listen on. `0` picks an ephemeral port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8080,
        }
    }
}

impl ServerConfig {
    fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ServerError::Bind(format!("invalid address {}:{}: {e}", self.host, self.port)))
    }
}

/// Bind the relay's listener.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    let addr = config.socket_addr()?;
    TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))
}

/// Serve the relay on `listener` until `shutdown` resolves.
pub async fn serve_until<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Relay listening");
    }
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Serve(e.to_string()))?;
    info!("Relay stopped");
    Ok(())
}

/// Bind and serve the relay until the process receives `Ctrl-C`.
///
/// # Errors
///
/// Returns an error if the address is invalid, the listener cannot
/// bind, or serving fails.
pub async fn start_server(config: &ServerConfig, state: Arc<AppState>) -> Result<(), ServerError> {
    let listener = bind(config).await?;
    serve_until(listener, state, ctrl_c()).await
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// Errors that can occur when starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listen address is invalid or could not be bound.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server failed while serving.
    #[error("serve error: {0}")]
    Serve(String),
}
