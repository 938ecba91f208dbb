use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::ScenarioGenerator;
use crate::config::{Config, ScenarioOutput};
use crate::scenario::{self, FormInput, Scenario};
use crate::snippet;

const MAX_FIELD_BYTES: usize = 4_000;
const RAW_BODY_SNIPPET: usize = 800;

const SYSTEM_PROMPT: &str =
    "You are a creative social media marketing expert specializing in Instagram Reels.";

fn trim_copy_utf8_safe(input: &str, max_bytes: usize) -> String {
    if input.len() <= max_bytes {
        return input.to_string();
    }

    let mut cut = max_bytes;
    while cut > 0 && !input.is_char_boundary(cut) {
        cut -= 1;
    }
    input[..cut].to_string()
}

pub fn build_prompt(input: &FormInput, count: u32, output: ScenarioOutput) -> String {
    let product = trim_copy_utf8_safe(input.product_description.trim(), MAX_FIELD_BYTES);
    let problem = trim_copy_utf8_safe(input.problem.trim(), MAX_FIELD_BYTES);
    let audience = trim_copy_utf8_safe(input.target_audience.trim(), MAX_FIELD_BYTES);

    let format_rules = match output {
        ScenarioOutput::Lines => "Format each scenario on its own line as:\n\
             Number. Title: Brief description of the scenario\n"
            .to_string(),
        ScenarioOutput::Json => "Return JSON with a `scenarios` array; each item has a short \
             `title` and a one or two sentence `description`.\n"
            .to_string(),
    };

    format!(
        "Generate {count} unique and creative Instagram Reel scenarios (10 seconds each) to promote the following product:\n\n\
         Product Description: {product}\n\
         Problem it solves: {problem}\n\
         Target Audience: {audience}\n\n\
         Each scenario should:\n\
         - Grab attention in the first second and fit a 10-second video\n\
         - Be relevant to the target audience and show the product's value\n\
         - Vary the approach (testimonials, demonstrations, before/after, storytelling, etc.)\n\
         - Leave product features out; they are inserted separately by hand\n\
         - Center on people from the target audience caught in the problem space\n\
         - Include something catastrophic or extraordinary that makes viewers stop scrolling\n\n\
         {format_rules}\n\
         Please ensure variety so there are many creative options to choose from."
    )
}

fn scenario_schema() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "reel_scenarios",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "scenarios": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": {"type": "string"},
                                "description": {"type": "string"}
                            },
                            "required": ["title", "description"],
                            "additionalProperties": false
                        }
                    }
                },
                "required": ["scenarios"],
                "additionalProperties": false
            }
        }
    })
}

/// `message (type, code)` from an API error object, when the body has one.
fn error_summary(root: &Value) -> Option<String> {
    let err = root.get("error")?;
    let message = err
        .get("message")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown error");
    let details: Vec<&str> = ["type", "code"]
        .iter()
        .filter_map(|key| err.get(*key).and_then(|v| v.as_str()))
        .collect();
    if details.is_empty() {
        Some(message.to_string())
    } else {
        Some(format!("{} ({})", message, details.join(", ")))
    }
}

/// Pulls `choices[0].message.content` out of a chat completion body.
fn extract_message_content(resp_json: &str) -> Option<String> {
    let root: Value = serde_json::from_str(resp_json).ok()?;

    if let Some(summary) = error_summary(&root) {
        warn!("OpenAI error: {}", summary);
        return None;
    }

    let message = root.get("choices")?.as_array()?.first()?.get("message")?;
    if let Some(refusal) = message.get("refusal").and_then(|v| v.as_str()) {
        warn!("OpenAI refused: {}", refusal);
        return None;
    }
    message
        .get("content")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    scenario_count: u32,
    output: ScenarioOutput,
}

impl OpenAiClient {
    pub fn from_config(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            api_key: cfg.openai_key.clone(),
            base_url: cfg.openai_base_url.trim_end_matches('/').to_string(),
            model: cfg.openai_model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            scenario_count: cfg.scenario_count,
            output: cfg.scenario_output,
        }
    }

    fn request_body(&self, input: &FormInput) -> Value {
        let prompt = build_prompt(input, self.scenario_count, self.output);
        let mut body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });
        if self.output == ScenarioOutput::Json {
            body["response_format"] = scenario_schema();
        }
        body
    }
}

#[async_trait]
impl ScenarioGenerator for OpenAiClient {
    async fn generate(&self, input: &FormInput) -> Result<Vec<Scenario>> {
        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(input))
            .send()
            .await
            .context("OpenAI request failed")?;

        let status = resp.status();
        let raw = resp.text().await.context("OpenAI response read failed")?;

        if !status.is_success() {
            warn!("OpenAI HTTP {}", status.as_u16());
            if !raw.is_empty() {
                warn!("OpenAI raw body: {}", snippet(&raw, RAW_BODY_SNIPPET));
            }
            let summary = serde_json::from_str::<Value>(&raw)
                .ok()
                .as_ref()
                .and_then(error_summary);
            match summary {
                Some(summary) => {
                    anyhow::bail!("OpenAI returned HTTP {}: {}", status.as_u16(), summary)
                }
                None => anyhow::bail!("OpenAI returned HTTP {}", status.as_u16()),
            }
        }

        let Some(content) = extract_message_content(&raw) else {
            warn!("OpenAI response parse failed.");
            if !raw.is_empty() {
                warn!("OpenAI raw body: {}", snippet(&raw, RAW_BODY_SNIPPET));
            }
            anyhow::bail!("OpenAI response had no message content");
        };

        let scenarios = match self.output {
            ScenarioOutput::Lines => scenario::parse_numbered_list(&content),
            ScenarioOutput::Json => scenario::parse_structured(&content)?,
        };
        info!("OpenAI returned {} scenarios", scenarios.len());
        Ok(scenarios)
    }
}
