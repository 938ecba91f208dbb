//! Upstream AI services behind object-safe traits so handlers can run
//! against in-process fakes.

use anyhow::Result;
use async_trait::async_trait;

use crate::scenario::{FormInput, Scenario};
use crate::video::{VideoError, VideoOutput};

pub mod openai;
pub mod replicate;

pub use openai::OpenAiClient;
pub use replicate::ReplicateClient;

#[async_trait]
pub trait ScenarioGenerator: Send + Sync {
    /// One model call; returns scenarios with ids from 1 and `selected == false`.
    async fn generate(&self, input: &FormInput) -> Result<Vec<Scenario>>;
}

#[async_trait]
pub trait VideoGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<VideoOutput, VideoError>;
}
