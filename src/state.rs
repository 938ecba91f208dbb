use anyhow::{Context, Result};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::api::{OpenAiClient, ReplicateClient, ScenarioGenerator, VideoGenerator};
use crate::config::Config;
use crate::generator::VideoPipeline;
use crate::session::SessionStore;
use crate::storage::VideoStore;

const USER_AGENT: &str = concat!("reel-scenarios/", env!("CARGO_PKG_VERSION"));

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub scenarios: Arc<dyn ScenarioGenerator>,
    pub videos: VideoPipeline,
    pub sessions: Arc<SessionStore>,
}

pub fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(30))
        .build()
        .context("failed to build reqwest client")
}

impl AppState {
    /// State wired to the real OpenAI and Replicate APIs.
    pub fn new(config: Config) -> Result<Self> {
        let http = http_client()?;
        let scenarios = Arc::new(OpenAiClient::from_config(http.clone(), &config));
        let videos = Arc::new(ReplicateClient::from_config(http.clone(), &config));
        Ok(Self::with_generators(config, http, scenarios, videos))
    }

    pub fn with_generators(
        config: Config,
        http: Client,
        scenarios: Arc<dyn ScenarioGenerator>,
        videos: Arc<dyn VideoGenerator>,
    ) -> Self {
        let store = Arc::new(VideoStore::new(config.video_dir.clone()));
        let sessions = Arc::new(SessionStore::new(config.session_ttl()));
        Self {
            config: Arc::new(config),
            scenarios,
            videos: VideoPipeline::new(videos, store, http),
            sessions,
        }
    }

    pub fn store(&self) -> &VideoStore {
        &self.videos.store
    }
}
