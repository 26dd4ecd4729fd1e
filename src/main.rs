//! Process bootstrap: load configuration, initialize logging, bootstrap
//! the engine, and serve the HTTP transport.

use std::sync::Arc;

use utxo_ledger_indexer::config::Config;
use utxo_ledger_indexer::engine::Engine;
use utxo_ledger_indexer::http::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = Config::load();
    tracing::info!(listen_addr = %cfg.listen_addr, "starting utxo-ledger-indexer");

    let engine = Engine::bootstrap(&cfg).await?;
    let state = AppState { engine: Arc::new(engine) };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    tracing::info!(addr = %cfg.listen_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shut down cleanly");
    Ok(())
}

/// Cross-platform graceful shutdown: SIGTERM + Ctrl+C on Unix, Ctrl+C only
/// elsewhere.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("SIGTERM received, shutting down"),
            _ = ctrl_c => tracing::info!("SIGINT received, shutting down"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("failed to register Ctrl+C handler");
        tracing::info!("Ctrl+C received, shutting down");
    }
}
