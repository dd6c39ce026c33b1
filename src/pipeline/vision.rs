//! Vision transcription client: PNG page image → Markdown text.
//!
//! One POST per page, no retries. The endpoint is any Qwen-VL style service;
//! two request shapes are spoken (see [`ApiFormat`]) and the response parser
//! accepts the answer field of either, so a misdetected format still works
//! against most gateways.

use crate::config::{ApiFormat, VisionConfig};
use crate::error::{ToolError, VisionError};
use crate::pipeline::encode::ImageBuffer;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// HTTP client bound to one endpoint configuration.
#[derive(Debug, Clone)]
pub struct VisionClient {
    config: VisionConfig,
    http: reqwest::Client,
}

impl VisionClient {
    pub fn new(config: VisionConfig) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ToolError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    /// Send `image` with the transcription prompt and return the raw answer.
    pub async fn transcribe(&self, image: &ImageBuffer) -> Result<String, VisionError> {
        let body = build_request(&self.config, &image.to_data_uri());
        let started = Instant::now();
        debug!(
            "POST {} ({:?}, model {})",
            self.config.api_url, self.config.api_format, self.config.model
        );

        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(VisionError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
                body: text,
            });
        }

        let json: Value =
            serde_json::from_str(&text).map_err(|e| VisionError::MalformedBody(e.to_string()))?;
        let markdown = extract_text(&json)?;

        info!(
            "Transcription received: {} chars in {:.0?}",
            markdown.len(),
            started.elapsed()
        );
        Ok(markdown)
    }

    fn transport_error(&self, e: reqwest::Error) -> VisionError {
        if e.is_timeout() {
            VisionError::Timeout {
                secs: self.config.timeout_secs,
            }
        } else {
            VisionError::Transport(e.to_string())
        }
    }
}

/// Request body for `config.api_format` carrying `data_uri` and the prompt.
pub fn build_request(config: &VisionConfig, data_uri: &str) -> Value {
    match config.api_format {
        ApiFormat::DashScope => json!({
            "model": config.model,
            "input": {
                "messages": [{
                    "role": "user",
                    "content": [
                        { "image": data_uri },
                        { "text": config.prompt }
                    ]
                }]
            }
        }),
        ApiFormat::OpenAiCompatible => json!({
            "model": config.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "image_url", "image_url": { "url": data_uri } },
                    { "type": "text", "text": config.prompt }
                ]
            }]
        }),
    }
}

/// Pull the transcription out of a response body.
///
/// Looks at `choices[0].message.content` (OpenAI shape), then `output.text`
/// and `output.choices[0].message.content` (DashScope shapes). Content may be
/// a string or a list of `{ "text": .. }` parts.
pub fn extract_text(body: &Value) -> Result<String, VisionError> {
    let found = [
        "/choices/0/message/content",
        "/output/text",
        "/output/choices/0/message/content",
    ]
    .iter()
    .find_map(|ptr| body.pointer(ptr).and_then(content_text));

    match found {
        Some(text) if text.trim().is_empty() => Err(VisionError::EmptyTranscription),
        Some(text) => Ok(text),
        None => Err(VisionError::UnexpectedResponse(body.to_string())),
    }
}

fn content_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect();
            (!texts.is_empty()).then(|| texts.concat())
        }
        _ => None,
    }
}
