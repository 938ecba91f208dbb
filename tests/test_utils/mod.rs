//! In-process fakes and a throwaway server for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reel_scenarios::api::{ScenarioGenerator, VideoGenerator};
use reel_scenarios::{AppState, Config, FormInput, Scenario, VideoError, VideoOutput, create_router};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Canned model output parsed the same way the real client parses it.
pub struct FakeScenarios {
    output: Option<String>,
    calls: AtomicUsize,
}

impl FakeScenarios {
    pub fn returning(text: &str) -> Self {
        Self {
            output: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            output: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScenarioGenerator for FakeScenarios {
    async fn generate(&self, _input: &FormInput) -> anyhow::Result<Vec<Scenario>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.output {
            Some(text) => Ok(reel_scenarios::scenario::parse_numbered_list(text)),
            None => anyhow::bail!("upstream unreachable"),
        }
    }
}

/// Picks an output shape from the scenario title:
/// `fail*` errors, `remote` returns the description as a URL, `stream*`
/// delivers chunks, `object` returns an unrecognized shape, anything else
/// returns the prompt bytes.
pub struct FakeVideos;

#[async_trait]
impl VideoGenerator for FakeVideos {
    async fn generate(&self, prompt: &str) -> Result<VideoOutput, VideoError> {
        let (title, description) = prompt.split_once(": ").unwrap_or((prompt, ""));
        if title.starts_with("fail") {
            return Err(VideoError::PredictionFailed("quota exceeded".to_string()));
        }
        if title == "remote" {
            return Ok(VideoOutput::Url(description.to_string()));
        }
        if title == "object" {
            return VideoOutput::classify(&serde_json::json!({"video_url": description}));
        }
        if title.starts_with("stream") {
            let chunks: Vec<Result<Bytes, VideoError>> = description
                .split(' ')
                .map(|part| Ok(Bytes::from(part.to_string())))
                .collect();
            return Ok(VideoOutput::Stream(futures::stream::iter(chunks).boxed()));
        }
        Ok(VideoOutput::Bytes(Bytes::from(prompt.to_string())))
    }
}

pub const MODEL_OUTPUT: &str = "Here you go:\n\
    1. Missed Deadline: A designer watches the upload bar freeze.\n\
    2. Coffee Flood: A mug tips onto the keyboard.\n\
    not a scenario\n\
    3. Rooftop Call: The wind drowns out an investor pitch.\n";

pub struct TestApp {
    pub base: String,
    pub client: reqwest::Client,
    pub state: AppState,
    pub dir: TempDir,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

pub async fn spawn_app(scenarios: Arc<dyn ScenarioGenerator>) -> TestApp {
    let dir = TempDir::new().expect("temp dir");
    let mut config = Config::with_keys("sk-test", "r8-test");
    config.video_dir = dir.path().join("videos");

    let state = AppState::with_generators(
        config,
        reqwest::Client::new(),
        scenarios,
        Arc::new(FakeVideos),
    );
    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });

    TestApp {
        base: format!("http://{}", addr),
        client: reqwest::Client::new(),
        state,
        dir,
    }
}

pub fn form(product: &str, problem: &str, audience: &str) -> serde_json::Value {
    serde_json::json!({
        "productDescription": product,
        "problem": problem,
        "targetAudience": audience,
    })
}
