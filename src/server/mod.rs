//! HTTP surface over the agent and its tools.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use crate::state::AppState;

pub mod handlers;
pub mod router;

/// Serve until Ctrl-C, then close the store.
pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let bind_addr = format!(
        "{}:{}",
        state.settings.server.host, state.settings.server.port
    );

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    println!("DOCS_AGENT_PORT={}", addr.port());
    tracing::info!("Listening on {}", addr);

    let app = router::router(state.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    state.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
