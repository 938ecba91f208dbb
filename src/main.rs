use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use reel_scenarios::session::SessionStore;
use reel_scenarios::{AppState, Config, create_router, init};

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

async fn load_config() -> Result<Config> {
    match std::env::var("REEL_CONFIG") {
        Ok(path) if !path.trim().is_empty() => Config::load(path.trim()).await,
        _ => Config::from_env(),
    }
}

fn spawn_session_purger(sessions: Arc<SessionStore>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            sessions.purge_expired().await;
        }
    });
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received shutdown signal");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init::init_tracing();

    let config = load_config().await?;
    init::ensure_directories(&config.video_dir).await?;

    let addr = config.bind_addr();
    let state = AppState::new(config)?;
    spawn_session_purger(Arc::clone(&state.sessions));

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}
