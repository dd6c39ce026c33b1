//! End-to-end entry points: file path + page number → PNG or Markdown.
//!
//! Every entry point validates the page number before the file is read, and
//! reads the file before pdfium is touched, so argument mistakes are reported
//! as such even when the document is also broken.

use crate::backend;
use crate::config::RasterConfig;
use crate::error::{RasterError, ToolError};
use crate::pipeline::document::{DocumentMetadata, PageSource};
use crate::pipeline::encode::ImageBuffer;
use crate::pipeline::geometry::{PageNumber, Viewport};
use crate::pipeline::vision::VisionClient;
use crate::pipeline::{input, postprocess, render};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Result of [`convert_page`].
#[derive(Debug, Clone)]
pub struct PageConversion {
    pub page: PageNumber,
    /// Cleaned transcription, ending in a newline.
    pub markdown: String,
    /// The image that was sent to the endpoint.
    pub png: ImageBuffer,
    pub render_duration_ms: u64,
    pub vision_duration_ms: u64,
}

/// Page count and per-page geometry of a document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub metadata: DocumentMetadata,
    pub pages: Vec<PageInfo>,
}

/// One page as the rasteriser would see it at the configured scale.
#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    pub page: PageNumber,
    pub width_pt: f32,
    pub height_pt: f32,
    pub viewport: Viewport,
}

/// Rasterise one page of the PDF at `path` to PNG.
///
/// # Errors
/// - [`crate::RasterError::InvalidArgument`] for `page_number ≤ 0` (checked first)
/// - [`ToolError::FileNotFound`] / [`ToolError::PermissionDenied`] for file access
/// - [`ToolError::Backend`] when pdfium cannot be located
/// - [`crate::RasterError::Parse`], [`crate::RasterError::PageOutOfRange`],
///   [`crate::RasterError::Render`]
pub async fn render_page_png(
    path: impl AsRef<Path>,
    page_number: i64,
    config: &RasterConfig,
) -> Result<ImageBuffer, ToolError> {
    let page = PageNumber::new(page_number)?;
    let bytes = input::read_pdf(path.as_ref()).await?;
    render::rasterize_page(bytes, i64::from(page.get()), config).await
}

/// Rasterise one page and transcribe it with `client`.
pub async fn convert_page(
    path: impl AsRef<Path>,
    page_number: i64,
    config: &RasterConfig,
    client: &VisionClient,
) -> Result<PageConversion, ToolError> {
    let path = path.as_ref();
    let page = PageNumber::new(page_number)?;
    info!("Converting {} page {}", path.display(), page);

    let render_start = Instant::now();
    let png = render_page_png(path, page_number, config).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    let vision_start = Instant::now();
    let raw = client.transcribe(&png).await?;
    let vision_duration_ms = vision_start.elapsed().as_millis() as u64;

    Ok(PageConversion {
        page,
        markdown: postprocess::clean_markdown(&raw),
        png,
        render_duration_ms,
        vision_duration_ms,
    })
}

/// Report page count, metadata and page geometry without rendering.
pub async fn inspect(
    path: impl AsRef<Path>,
    config: &RasterConfig,
) -> Result<DocumentInfo, ToolError> {
    let bytes = input::read_pdf(path.as_ref()).await?;
    let backend = backend::init(config.pdfium_library.as_deref())?;
    let config = config.clone();

    tokio::task::spawn_blocking(move || -> Result<DocumentInfo, ToolError> {
        let session = backend
            .session()
            .map_err(|e| ToolError::Backend(e.to_string()))?;
        let document = session.load(bytes, config.password.as_deref())?;

        let page_count = document.page_count();
        let mut pages = Vec::with_capacity(page_count);
        for n in 1..=page_count {
            let page = PageNumber::new(n as i64)?;
            let size = document.page_size(page)?;
            pages.push(PageInfo {
                page,
                width_pt: size.width_pt,
                height_pt: size.height_pt,
                viewport: Viewport::new(page, size, config.scale)?,
            });
        }

        Ok(DocumentInfo {
            page_count,
            metadata: document.metadata(),
            pages,
        })
    })
    .await
    .map_err(inspect_panicked)?
}

/// A panic while walking the document says nothing about the pdfium install,
/// so it is reported against the document.
fn inspect_panicked(e: tokio::task::JoinError) -> ToolError {
    RasterError::Parse(format!("document inspection panicked: {e}")).into()
}
