//! Liveness endpoints for hosting platforms that check an HTTP port.

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::error::ChannelError;

/// Build the health router. Stateless.
pub fn health_routes() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
}

async fn index() -> &'static str {
    "Taste bot is running"
}

async fn health() -> &'static str {
    "OK"
}

/// Bind `0.0.0.0:port` and serve [`health_routes`] in the background.
pub async fn spawn_health_server(port: u16) -> Result<JoinHandle<()>, ChannelError> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| ChannelError::StartupFailed {
            name: "health".to_string(),
            reason: format!("bind port {port}: {e}"),
        })?;
    tracing::info!(port, "Health server started");
    Ok(serve_on(listener))
}

/// Serve [`health_routes`] on an already bound listener.
pub fn serve_on(listener: TcpListener) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health_routes()).await {
            tracing::error!("Health server stopped: {e}");
        }
    })
}
