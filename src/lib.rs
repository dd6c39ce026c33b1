//! # pdf2md-mcp
//!
//! Convert one page of a PDF to Markdown by rendering it to PNG and letting a
//! vision model (Qwen-VL or any OpenAI-compatible endpoint) read it.
//!
//! ## Why render instead of extracting text?
//!
//! Text extraction from the PDF object model loses reading order on
//! multi-column layouts and turns tables into word soup. A rendered page is
//! exactly what a human reader sees, and vision models transcribe it with
//! structure intact.
//!
//! ## Pipeline Overview
//!
//! ```text
//! (pdf_path, page_number)
//!  │
//!  ├─ 1. Input     validate path, read bytes
//!  ├─ 2. Load      parse with pdfium (no JavaScript, no network)
//!  ├─ 3. Render    validate page, viewport at scale 2.0, white surface, draw
//!  ├─ 4. Encode    PNG → data URI
//!  ├─ 5. Vision    one POST to QWEN_API_URL
//!  └─ 6. Polish    strip fences and stray whitespace
//! ```
//!
//! Steps 1–4 are the rasterisation core and need no network; see
//! [`render_page_png`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2md_mcp::{render_page_png, RasterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let png = render_page_png("/tmp/report.pdf", 1, &RasterConfig::default()).await?;
//!     std::fs::write("page-1.png", png.as_bytes())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2md-mcp` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod convert;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ApiFormat, RasterConfig, RasterConfigBuilder, VisionConfig};
pub use convert::{convert_page, inspect, render_page_png, DocumentInfo, PageConversion, PageInfo};
pub use error::{RasterError, ToolError, VisionError};
pub use pipeline::document::{DocumentHandle, DocumentMetadata, PageSource};
pub use pipeline::encode::ImageBuffer;
pub use pipeline::geometry::{PageNumber, PageSize, Viewport};
pub use pipeline::render::{rasterize_page, render};
pub use pipeline::surface::DrawingSurface;
pub use pipeline::vision::VisionClient;
pub use server::{run_stdio, Pdf2MdServer};
