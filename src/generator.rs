use futures::future::join_all;
use reqwest::Client;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::VideoGenerator;
use crate::scenario::Scenario;
use crate::storage::VideoStore;
use crate::video::{VideoError, VideoResult};

/// Everything a batch needs, cheap to clone into per-item tasks.
#[derive(Clone)]
pub struct VideoPipeline {
    pub generator: Arc<dyn VideoGenerator>,
    pub store: Arc<VideoStore>,
    pub http: Client,
}

impl VideoPipeline {
    pub fn new(generator: Arc<dyn VideoGenerator>, store: Arc<VideoStore>, http: Client) -> Self {
        Self {
            generator,
            store,
            http,
        }
    }

    async fn render(&self, scenario: &Scenario) -> Result<String, VideoError> {
        let output = self.generator.generate(&scenario.video_prompt()).await?;
        self.store.persist(&self.http, scenario.id, output).await
    }

    async fn render_isolated(self, scenario: Scenario) -> VideoResult {
        match self.render(&scenario).await {
            Ok(url) => {
                info!("Video for scenario {} ready at {}", scenario.id, url);
                VideoResult::completed(&scenario, url)
            }
            Err(err) => {
                warn!("Error generating video for scenario {}: {}", scenario.id, err);
                VideoResult::failed(&scenario, err.to_string())
            }
        }
    }

    /// Renders every scenario concurrently and waits for all of them. The
    /// result has one entry per input, in input order; a failing or panicking
    /// item only fails itself.
    pub async fn run_batch(&self, scenarios: &[Scenario]) -> Vec<VideoResult> {
        info!("Starting video batch of {} scenarios", scenarios.len());

        let handles: Vec<_> = scenarios
            .iter()
            .cloned()
            .map(|scenario| tokio::spawn(self.clone().render_isolated(scenario)))
            .collect();

        let results: Vec<VideoResult> = join_all(handles)
            .await
            .into_iter()
            .zip(scenarios)
            .map(|(joined, scenario)| {
                joined.unwrap_or_else(|join_err| {
                    let err = VideoError::Task(join_err.to_string());
                    warn!("Video task for scenario {} died: {}", scenario.id, err);
                    VideoResult::failed(scenario, err.to_string())
                })
            })
            .collect();

        let completed = results.iter().filter(|r| r.is_completed()).count();
        info!(
            "Video batch finished: {} completed, {} failed",
            completed,
            results.len() - completed
        );
        results
    }
}
