use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::VideoGenerator;
use crate::config::Config;
use crate::snippet;
use crate::video::{VideoError, VideoOutput};

const RAW_BODY_SNIPPET: usize = 800;

/// Prediction resource as returned by both the create and the get endpoint.
#[derive(Debug, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub status: PredictionStatus,
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

impl PredictionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

impl Prediction {
    fn error_text(&self) -> String {
        match &self.error {
            Some(Value::String(text)) if !text.trim().is_empty() => text.clone(),
            Some(Value::Null) | None => format!("prediction {} ended as {:?}", self.id, self.status),
            Some(other) => snippet(&other.to_string(), RAW_BODY_SNIPPET),
        }
    }
}

pub struct ReplicateClient {
    client: Client,
    api_token: String,
    base_url: String,
    model: String,
    poll_interval: Duration,
}

impl ReplicateClient {
    pub fn from_config(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            api_token: cfg.replicate_token.clone(),
            base_url: cfg.replicate_base_url.trim_end_matches('/').to_string(),
            model: cfg.replicate_model.clone(),
            poll_interval: cfg.poll_interval(),
        }
    }

    async fn read_prediction(resp: reqwest::Response) -> Result<Prediction, VideoError> {
        let status = resp.status();
        let raw = resp.text().await?;
        if !status.is_success() {
            warn!("Replicate HTTP {}", status.as_u16());
            return Err(VideoError::Upstream {
                status: status.as_u16(),
                body: snippet(&raw, RAW_BODY_SNIPPET),
            });
        }
        serde_json::from_str(&raw).map_err(|e| {
            warn!("Replicate raw body: {}", snippet(&raw, RAW_BODY_SNIPPET));
            VideoError::UnrecognizedOutput(format!("prediction body did not parse: {e}"))
        })
    }

    pub async fn create_prediction(&self, prompt: &str) -> Result<Prediction, VideoError> {
        let resp = self
            .client
            .post(format!("{}/v1/models/{}/predictions", self.base_url, self.model))
            .bearer_auth(&self.api_token)
            .header("Prefer", "wait")
            .json(&json!({"input": {"prompt": prompt}}))
            .send()
            .await?;
        Self::read_prediction(resp).await
    }

    pub async fn get_prediction(&self, id: &str) -> Result<Prediction, VideoError> {
        let resp = self
            .client
            .get(format!("{}/v1/predictions/{}", self.base_url, id))
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        Self::read_prediction(resp).await
    }
}

#[async_trait]
impl VideoGenerator for ReplicateClient {
    async fn generate(&self, prompt: &str) -> Result<VideoOutput, VideoError> {
        let mut prediction = self.create_prediction(prompt).await?;
        info!("Replicate prediction {} created ({:?})", prediction.id, prediction.status);

        while !prediction.status.is_terminal() {
            tokio::time::sleep(self.poll_interval).await;
            prediction = self.get_prediction(&prediction.id).await?;
            debug!("Replicate prediction {} is {:?}", prediction.id, prediction.status);
        }

        match prediction.status {
            PredictionStatus::Succeeded => VideoOutput::classify(&prediction.output),
            _ => Err(VideoError::PredictionFailed(prediction.error_text())),
        }
    }
}
