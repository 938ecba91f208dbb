use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::scenario::Scenario;
use crate::snippet;

const OUTPUT_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("Video API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Video API returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Video generation failed: {0}")]
    PredictionFailed(String),

    #[error("Unexpected output format: {0}")]
    UnrecognizedOutput(String),

    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    #[error("Video download failed with HTTP {status} from {url}")]
    Download { status: u16, url: String },

    #[error("Video payload was empty")]
    EmptyPayload,

    #[error("Failed to save video: {0}")]
    Io(#[from] std::io::Error),

    #[error("Video task aborted: {0}")]
    Task(String),
}

/// What the video API handed back, classified before anything is saved.
pub enum VideoOutput {
    /// Remote file to fetch.
    Url(String),
    /// Payload already in memory.
    Bytes(Bytes),
    /// Payload delivered in chunks; drained in arrival order.
    Stream(BoxStream<'static, Result<Bytes, VideoError>>),
}

impl fmt::Debug for VideoOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoOutput::Url(url) => f.debug_tuple("Url").field(url).finish(),
            VideoOutput::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            VideoOutput::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl VideoOutput {
    /// Classifies a prediction `output` field. Accepts a string or a list
    /// whose first element is a string; everything else is rejected.
    pub fn classify(output: &Value) -> Result<Self, VideoError> {
        match output {
            Value::String(text) => Self::classify_str(text, output),
            Value::Array(items) => match items.first() {
                Some(Value::String(text)) => Self::classify_str(text, output),
                _ => Err(unrecognized(output)),
            },
            _ => Err(unrecognized(output)),
        }
    }

    fn classify_str(text: &str, original: &Value) -> Result<Self, VideoError> {
        let text = text.trim();
        if text.starts_with("https://") || text.starts_with("http://") {
            return Ok(VideoOutput::Url(text.to_string()));
        }
        if text.starts_with("data:") {
            return decode_data_uri(text).map(VideoOutput::Bytes);
        }
        Err(unrecognized(original))
    }
}

fn unrecognized(output: &Value) -> VideoError {
    let raw = serde_json::to_string(output).unwrap_or_else(|_| output.to_string());
    VideoError::UnrecognizedOutput(snippet(&raw, OUTPUT_SNIPPET_CHARS))
}

fn decode_data_uri(uri: &str) -> Result<Bytes, VideoError> {
    let rest = &uri["data:".len()..];
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| VideoError::InvalidDataUri("missing `,` separator".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(VideoError::InvalidDataUri(format!(
            "expected base64 encoding, got `{}`",
            snippet(header, 60)
        )));
    }
    let decoded = STANDARD
        .decode(payload.trim())
        .map_err(|e| VideoError::InvalidDataUri(e.to_string()))?;
    if decoded.is_empty() {
        return Err(VideoError::EmptyPayload);
    }
    Ok(Bytes::from(decoded))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Completed,
    Failed,
}

/// Outcome of rendering one scenario. Build it with [`VideoResult::completed`]
/// or [`VideoResult::failed`] so `video_url` and `status` stay consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResult {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub video_url: Option<String>,
    pub status: VideoStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VideoResult {
    pub fn completed(scenario: &Scenario, video_url: impl Into<String>) -> Self {
        Self {
            id: scenario.id,
            title: scenario.title.clone(),
            description: scenario.description.clone(),
            video_url: Some(video_url.into()),
            status: VideoStatus::Completed,
            error: None,
        }
    }

    pub fn failed(scenario: &Scenario, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = "Unknown error".to_string();
        }
        Self {
            id: scenario.id,
            title: scenario.title.clone(),
            description: scenario.description.clone(),
            video_url: None,
            status: VideoStatus::Failed,
            error: Some(message),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == VideoStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_http_string_as_url() {
        let output = VideoOutput::classify(&json!("https://replicate.delivery/x/out.mp4")).unwrap();
        assert!(matches!(output, VideoOutput::Url(ref u) if u == "https://replicate.delivery/x/out.mp4"));
    }

    #[test]
    fn classifies_first_list_element() {
        let output =
            VideoOutput::classify(&json!(["http://cdn.test/a.mp4", "http://cdn.test/b.mp4"]))
                .unwrap();
        assert!(matches!(output, VideoOutput::Url(ref u) if u.ends_with("a.mp4")));
    }

    #[test]
    fn classifies_data_uri_as_bytes() {
        let output = VideoOutput::classify(&json!("data:video/mp4;base64,AAECAw==")).unwrap();
        match output {
            VideoOutput::Bytes(bytes) => assert_eq!(bytes.as_ref(), &[0u8, 1, 2, 3]),
            other => panic!("expected bytes, got {:?}", other),
        }
    }

    #[test]
    fn rejects_object_output_with_snippet() {
        let err = VideoOutput::classify(&json!({"video_url": "https://cdn.test/v.mp4"})).unwrap_err();
        match err {
            VideoError::UnrecognizedOutput(text) => assert!(text.contains("video_url")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_non_http_strings_and_empty_lists() {
        assert!(matches!(
            VideoOutput::classify(&json!("ftp://nope")),
            Err(VideoError::UnrecognizedOutput(_))
        ));
        assert!(matches!(
            VideoOutput::classify(&json!([])),
            Err(VideoError::UnrecognizedOutput(_))
        ));
        assert!(matches!(
            VideoOutput::classify(&Value::Null),
            Err(VideoError::UnrecognizedOutput(_))
        ));
    }

    #[test]
    fn unrecognized_snippet_is_capped() {
        let long = "x".repeat(1000);
        let err = VideoOutput::classify(&json!({ "blob": long })).unwrap_err();
        match err {
            VideoError::UnrecognizedOutput(text) => assert_eq!(text.chars().count(), 200),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_data_uris() {
        assert!(matches!(
            VideoOutput::classify(&json!("data:video/mp4;base64")),
            Err(VideoError::InvalidDataUri(_))
        ));
        assert!(matches!(
            VideoOutput::classify(&json!("data:text/plain,hello")),
            Err(VideoError::InvalidDataUri(_))
        ));
        assert!(matches!(
            VideoOutput::classify(&json!("data:video/mp4;base64,")),
            Err(VideoError::EmptyPayload)
        ));
    }

    #[test]
    fn failed_result_serializes_null_url_and_error() {
        let scenario = Scenario::new(7, "T", "D");
        let result = VideoResult::failed(&scenario, "");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["videoUrl"], Value::Null);
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"], "Unknown error");
    }

    #[test]
    fn completed_result_omits_error() {
        let scenario = Scenario::new(3, "T", "D");
        let value =
            serde_json::to_value(VideoResult::completed(&scenario, "/videos/v.mp4")).unwrap();
        assert_eq!(value["videoUrl"], "/videos/v.mp4");
        assert_eq!(value["status"], "completed");
        assert!(value.get("error").is_none());
    }
}
