// Pari-mutuel Prediction Market - Main Entry Point

use anyhow::Context;
use parimutuel_ledger::{config, routes, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::load()?;
    config.logging.init();

    info!("═══════════════════════════════════════════════");
    info!("     🎲 Pari-mutuel Prediction Market Ledger");
    info!("═══════════════════════════════════════════════");

    let state = AppState::new(&config)?.shared();
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;

    info!("🚀 Server running on http://{}", config.server.bind);
    info!("📋 Available Endpoints:");
    for (method, path, summary) in routes::ENDPOINTS {
        info!("   {:<5} {:<32} - {}", method, path, summary);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("👋 Goodbye!");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("🛑 Shutdown signal received...");
    }
}
