//! Configuration types.
//!
//! Two independent configs reflect the two halves of a request:
//!
//! * [`RasterConfig`] drives the rasterisation core. It is built via
//!   [`RasterConfigBuilder`] so every knob has a validated default.
//! * [`VisionConfig`] describes the transcription endpoint. It is normally
//!   read from the environment with [`VisionConfig::from_env`].

use crate::error::ToolError;
use crate::prompts::DEFAULT_TRANSCRIPTION_PROMPT;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default page scale: 1 PDF point becomes 2 device pixels (144 DPI).
///
/// Observed revisions of this tool used both 1.0 and 2.0. 2.0 keeps body text
/// legible for vision models; 1.0 halves each edge and quarters memory.
pub const DEFAULT_RENDER_SCALE: f32 = 2.0;

/// Smallest accepted scale factor.
pub const MIN_RENDER_SCALE: f32 = 0.25;

/// Largest accepted scale factor.
pub const MAX_RENDER_SCALE: f32 = 8.0;

/// Default ceiling on drawing-surface area (a 10 000 × 10 000 canvas).
pub const DEFAULT_MAX_SURFACE_PIXELS: u64 = 100_000_000;

/// Configuration for the rasterisation core.
///
/// # Example
/// ```rust
/// use pdf2md_mcp::RasterConfig;
///
/// let config = RasterConfig::builder()
///     .scale(1.0)
///     .build()
///     .unwrap();
/// assert_eq!(config.scale, 1.0);
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterConfig {
    /// Device pixels per PDF point. Range: 0.25–8.0. Default: 2.0.
    pub scale: f32,

    /// Largest surface (width × height) that may be allocated. Default: 100 M.
    ///
    /// A viewport over this limit fails with a render error before allocation;
    /// the surface is never silently shrunk.
    pub max_surface_pixels: u64,

    /// User password for encrypted documents. The server tool never sets it.
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Explicit pdfium library path, bypassing the local search.
    pub pdfium_library: Option<PathBuf>,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_RENDER_SCALE,
            max_surface_pixels: DEFAULT_MAX_SURFACE_PIXELS,
            password: None,
            pdfium_library: None,
        }
    }
}

impl fmt::Debug for RasterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterConfig")
            .field("scale", &self.scale)
            .field("max_surface_pixels", &self.max_surface_pixels)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_library", &self.pdfium_library)
            .finish()
    }
}

impl RasterConfig {
    /// Create a new builder for `RasterConfig`.
    pub fn builder() -> RasterConfigBuilder {
        RasterConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RasterConfig`].
#[derive(Debug)]
pub struct RasterConfigBuilder {
    config: RasterConfig,
}

impl RasterConfigBuilder {
    pub fn scale(mut self, scale: f32) -> Self {
        self.config.scale = scale;
        self
    }

    pub fn max_surface_pixels(mut self, px: u64) -> Self {
        self.config.max_surface_pixels = px;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RasterConfig, ToolError> {
        let c = &self.config;
        if !c.scale.is_finite() || !(MIN_RENDER_SCALE..=MAX_RENDER_SCALE).contains(&c.scale) {
            return Err(ToolError::InvalidConfig(format!(
                "scale must be {MIN_RENDER_SCALE}–{MAX_RENDER_SCALE}, got {}",
                c.scale
            )));
        }
        if c.max_surface_pixels == 0 {
            return Err(ToolError::InvalidConfig(
                "max_surface_pixels must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Vision endpoint ──────────────────────────────────────────────────────

/// Default model identifier sent to the endpoint.
pub const DEFAULT_VISION_MODEL: &str = "qwen-vl-max";

/// Default per-request timeout in seconds.
pub const DEFAULT_VISION_TIMEOUT_SECS: u64 = 120;

/// Request/response shape spoken by the transcription endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ApiFormat {
    /// DashScope native multimodal generation: `input.messages`, answer in `output.text`.
    #[default]
    DashScope,
    /// OpenAI-compatible chat completions: `messages` with `image_url` parts,
    /// answer in `choices[0].message.content`.
    OpenAiCompatible,
}

impl ApiFormat {
    /// Guess the format from the endpoint URL. Chat-completions paths speak
    /// the OpenAI shape; everything else is treated as DashScope.
    pub fn detect(api_url: &str) -> Self {
        if api_url.trim_end_matches('/').ends_with("/chat/completions") {
            ApiFormat::OpenAiCompatible
        } else {
            ApiFormat::DashScope
        }
    }
}

impl FromStr for ApiFormat {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dashscope" | "qwen" => Ok(ApiFormat::DashScope),
            "openai" | "openai-compatible" | "openai_compatible" => {
                Ok(ApiFormat::OpenAiCompatible)
            }
            other => Err(ToolError::InvalidConfig(format!(
                "unknown API format '{other}' (expected dashscope or openai)"
            ))),
        }
    }
}

/// Connection settings for the vision transcription endpoint.
#[derive(Clone)]
pub struct VisionConfig {
    /// Full endpoint URL (`QWEN_API_URL`).
    pub api_url: String,
    /// Bearer token (`QWEN_API_KEY`).
    pub api_key: String,
    /// Model identifier (`QWEN_MODEL`). Default: `qwen-vl-max`.
    pub model: String,
    /// Instruction sent alongside the page image.
    pub prompt: String,
    /// Request shape (`QWEN_API_FORMAT`). Detected from the URL when unset.
    pub api_format: ApiFormat,
    /// Request timeout (`QWEN_TIMEOUT_SECS`). Default: 120.
    pub timeout_secs: u64,
}

impl fmt::Debug for VisionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisionConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_format", &self.api_format)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl VisionConfig {
    /// Config for `api_url` with every other field at its default.
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let api_url = api_url.into();
        Self {
            api_format: ApiFormat::detect(&api_url),
            api_url,
            api_key: api_key.into(),
            model: DEFAULT_VISION_MODEL.to_string(),
            prompt: DEFAULT_TRANSCRIPTION_PROMPT.to_string(),
            timeout_secs: DEFAULT_VISION_TIMEOUT_SECS,
        }
    }

    /// Read the config from process environment variables.
    pub fn from_env() -> Result<Self, ToolError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the config through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ToolError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let (Some(api_url), Some(api_key)) = (get("QWEN_API_URL"), get("QWEN_API_KEY")) else {
            return Err(ToolError::InvalidConfig(
                "Missing required environment variables: QWEN_API_URL and QWEN_API_KEY must be set"
                    .into(),
            ));
        };

        let mut config = Self::new(api_url, api_key);
        if let Some(model) = get("QWEN_MODEL") {
            config.model = model;
        }
        if let Some(format) = get("QWEN_API_FORMAT") {
            config.api_format = format.parse()?;
        }
        if let Some(secs) = get("QWEN_TIMEOUT_SECS") {
            config.timeout_secs = secs.trim().parse().map_err(|_| {
                ToolError::InvalidConfig(format!(
                    "QWEN_TIMEOUT_SECS must be an integer, got '{secs}'"
                ))
            })?;
        }
        if config.timeout_secs == 0 {
            return Err(ToolError::InvalidConfig(
                "QWEN_TIMEOUT_SECS must be ≥ 1".into(),
            ));
        }
        Ok(config)
    }
}
