use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// How scenario text is requested from the model and parsed back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioOutput {
    /// Free text, one `N. Title: description` line per scenario.
    #[default]
    Lines,
    /// Strict JSON schema output.
    Json,
}

impl ScenarioOutput {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "lines" | "text" => Some(Self::Lines),
            "json" | "schema" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "openai_api_key")]
    pub openai_key: String,
    #[serde(rename = "replicate_api_token")]
    pub replicate_token: String,

    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_video_dir")]
    pub video_dir: PathBuf,

    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_scenario_count")]
    pub scenario_count: u32,
    #[serde(default)]
    pub scenario_output: ScenarioOutput,

    #[serde(default = "default_replicate_base_url")]
    pub replicate_base_url: String,
    #[serde(default = "default_replicate_model")]
    pub replicate_model: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_video_dir() -> PathBuf {
    PathBuf::from("public/videos")
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f64 {
    0.8
}

fn default_max_tokens() -> u32 {
    3000
}

fn default_scenario_count() -> u32 {
    50
}

fn default_replicate_base_url() -> String {
    "https://api.replicate.com".to_string()
}

fn default_replicate_model() -> String {
    "google/veo-2".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_session_ttl_secs() -> u64 {
    3600
}

fn default_max_body_size() -> usize {
    1024 * 1024
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Config with the given credentials and every other field at its default.
    pub fn with_keys(openai_key: impl Into<String>, replicate_token: impl Into<String>) -> Self {
        Self {
            openai_key: openai_key.into(),
            replicate_token: replicate_token.into(),
            host: default_host(),
            port: default_port(),
            video_dir: default_video_dir(),
            openai_base_url: default_openai_base_url(),
            openai_model: default_openai_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            scenario_count: default_scenario_count(),
            scenario_output: ScenarioOutput::default(),
            replicate_base_url: default_replicate_base_url(),
            replicate_model: default_replicate_model(),
            poll_interval_ms: default_poll_interval_ms(),
            session_ttl_secs: default_session_ttl_secs(),
            max_body_size: default_max_body_size(),
        }
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self> {
        let mut config = Self::with_keys(
            std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            std::env::var("REPLICATE_API_TOKEN").unwrap_or_default(),
        );

        config.host = std::env::var("HOST").unwrap_or(config.host);
        config.port = env_or("PORT", config.port);
        if let Ok(dir) = std::env::var("VIDEO_DIR") {
            config.video_dir = PathBuf::from(dir);
        }

        config.openai_base_url = std::env::var("OPENAI_BASE_URL").unwrap_or(config.openai_base_url);
        config.openai_model = std::env::var("OPENAI_MODEL").unwrap_or(config.openai_model);
        config.temperature = env_or("OPENAI_TEMPERATURE", config.temperature);
        config.max_tokens = env_or("OPENAI_MAX_TOKENS", config.max_tokens);
        config.scenario_count = env_or("SCENARIO_COUNT", config.scenario_count);
        if let Ok(mode) = std::env::var("SCENARIO_OUTPUT") {
            config.scenario_output = ScenarioOutput::parse(&mode)
                .with_context(|| format!("SCENARIO_OUTPUT must be `lines` or `json`, got `{mode}`"))?;
        }

        config.replicate_base_url =
            std::env::var("REPLICATE_BASE_URL").unwrap_or(config.replicate_base_url);
        config.replicate_model = std::env::var("REPLICATE_MODEL").unwrap_or(config.replicate_model);
        config.poll_interval_ms = env_or("REPLICATE_POLL_INTERVAL_MS", config.poll_interval_ms);

        config.session_ttl_secs = env_or("SESSION_TTL_SECS", config.session_ttl_secs);
        config.max_body_size = env_or("MAX_BODY_SIZE", config.max_body_size);

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.openai_key.trim().is_empty() {
            anyhow::bail!("OPENAI_API_KEY missing");
        }
        if self.replicate_token.trim().is_empty() {
            anyhow::bail!("REPLICATE_API_TOKEN missing");
        }
        if self.scenario_count == 0 {
            anyhow::bail!("SCENARIO_COUNT must be at least 1");
        }
        if !self.replicate_model.contains('/') {
            anyhow::bail!(
                "REPLICATE_MODEL must look like owner/name, got `{}`",
                self.replicate_model
            );
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}
