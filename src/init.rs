use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "reel_scenarios=info,tower_http=info";

/// Installs the global tracing subscriber. `LOG_FORMAT=json` switches to
/// JSON lines; `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(env_filter)
            .init();
    }
}

pub async fn ensure_directories(video_dir: &Path) -> Result<()> {
    if !fs::try_exists(video_dir).await.unwrap_or(false) {
        fs::create_dir_all(video_dir)
            .await
            .with_context(|| format!("Failed to create directory {}", video_dir.display()))?;
        tracing::info!("Created directory: {}", video_dir.display());
    }
    Ok(())
}
