//! Document loading: PDF bytes → page-addressable [`DocumentHandle`].
//!
//! The loader is pure with respect to its input: it receives bytes (reading
//! the file is [`crate::pipeline::input`]'s job) and never reaches for the
//! network. pdfium is bound without a JavaScript platform, so scripts embedded
//! in a document are never evaluated. Glyphs for fonts the document does not
//! embed come from pdfium's default system font mapper, which is the one
//! environment-dependent input to rendering.

use crate::error::RasterError;
use crate::pipeline::geometry::{PageNumber, PageSize};
use crate::pipeline::surface::DrawingSurface;
use image::imageops::{self, FilterType};
use pdfium_render::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

/// How far into the file the `%PDF-` marker may appear. Some producers
/// prepend junk (e.g. a MacBinary header); pdfium tolerates that, so do we.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Clear colour for the content layer pdfium draws into. Transparent, so the
/// layer composites over the surface's white instead of replacing it.
const CONTENT_LAYER_CLEAR: PdfColor = PdfColor::new(255, 255, 255, 0);

/// What the rasteriser needs from a loaded document.
///
/// Implemented by [`DocumentHandle`] for real PDFs; tests supply in-memory
/// sources to exercise the rasteriser without a native library.
pub trait PageSource {
    /// Number of pages. Always ≥ 1 for a loaded document.
    fn page_count(&self) -> usize;

    /// Intrinsic size of `page` in points. `page` is within range.
    fn page_size(&self, page: PageNumber) -> Result<PageSize, RasterError>;

    /// Draw `page` onto `surface`, scaled to the surface's viewport.
    fn draw_page(&self, page: PageNumber, surface: &mut DrawingSurface) -> Result<(), RasterError>;
}

/// Reject byte sequences that cannot be a PDF before handing them to pdfium.
pub fn sniff_header(bytes: &[u8]) -> Result<(), RasterError> {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    if window.windows(5).any(|w| w == b"%PDF-") {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(RasterError::Parse(format!(
        "not a PDF: no %PDF- header (first bytes: {magic:?})"
    )))
}

/// Entries of the document information dictionary. Absent or empty entries
/// are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub pdf_version: String,
}

/// A parsed PDF, owned for the duration of one request.
pub struct DocumentHandle<'a> {
    document: PdfDocument<'a>,
    page_count: usize,
}

impl<'a> DocumentHandle<'a> {
    /// Parse `bytes` with `pdfium`.
    ///
    /// Fails with [`RasterError::Parse`] for non-PDF input, corrupt
    /// structure, encryption without the right password, and documents that
    /// report zero pages.
    pub fn load(
        pdfium: &'a Pdfium,
        bytes: Vec<u8>,
        password: Option<&str>,
    ) -> Result<Self, RasterError> {
        sniff_header(&bytes)?;
        let len = bytes.len();

        let document = pdfium
            .load_pdf_from_byte_vec(bytes, password)
            .map_err(|e| match e {
                PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
                    RasterError::Parse(if password.is_some() {
                        "wrong password for encrypted document".to_string()
                    } else {
                        "document is encrypted and requires a password".to_string()
                    })
                }
                other => RasterError::Parse(format!("{:?}", other)),
            })?;

        let page_count = document.pages().len() as usize;
        if page_count == 0 {
            return Err(RasterError::Parse("document contains no pages".into()));
        }

        info!("PDF loaded: {} pages ({} bytes)", page_count, len);
        Ok(Self {
            document,
            page_count,
        })
    }

    /// Read the information dictionary. Never fails; missing entries are `None`.
    pub fn metadata(&self) -> DocumentMetadata {
        let metadata = self.document.metadata();
        let get = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata
                .get(tag)
                .map(|t| t.value().trim().to_string())
                .filter(|v| !v.is_empty())
        };

        DocumentMetadata {
            title: get(PdfDocumentMetadataTagType::Title),
            author: get(PdfDocumentMetadataTagType::Author),
            creator: get(PdfDocumentMetadataTagType::Creator),
            producer: get(PdfDocumentMetadataTagType::Producer),
            pdf_version: format!("{:?}", self.document.version()),
        }
    }

    fn page(&self, page: PageNumber) -> Result<PdfPage<'a>, RasterError> {
        let index = PdfPageIndex::try_from(page.index()).map_err(|_| {
            RasterError::PageOutOfRange {
                page: page.get(),
                total: self.page_count,
            }
        })?;
        self.document
            .pages()
            .get(index)
            .map_err(|e| RasterError::render(page.get(), format!("{:?}", e)))
    }
}

impl<'a> PageSource for DocumentHandle<'a> {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_size(&self, page: PageNumber) -> Result<PageSize, RasterError> {
        let pdf_page = self.page(page)?;
        PageSize::new(page, pdf_page.width().value, pdf_page.height().value)
    }

    fn draw_page(
        &self,
        page: PageNumber,
        surface: &mut DrawingSurface,
    ) -> Result<(), RasterError> {
        let pdf_page = self.page(page)?;
        let viewport = surface.viewport();
        let too_large = |_| {
            RasterError::render(page.get(), format!("viewport {viewport} exceeds pdfium limits"))
        };
        let width = i32::try_from(viewport.width_px).map_err(too_large)?;
        let height = i32::try_from(viewport.height_px).map_err(too_large)?;

        let render_config = PdfRenderConfig::new()
            .set_target_width(width)
            .set_target_height(height)
            .set_clear_color(CONTENT_LAYER_CLEAR);

        let bitmap = pdf_page
            .render_with_config(&render_config)
            .map_err(|e| RasterError::render(page.get(), format!("{:?}", e)))?;

        let mut layer = bitmap.as_image().into_rgba8();
        if layer.dimensions() != (viewport.width_px, viewport.height_px) {
            // pdfium rounds its own target size; absorb an off-by-one edge.
            debug!(
                "Page {}: pdfium produced {}x{}, resampling to {}",
                page,
                layer.width(),
                layer.height(),
                viewport
            );
            layer = imageops::resize(
                &layer,
                viewport.width_px,
                viewport.height_px,
                FilterType::Triangle,
            );
        }

        surface.composite(&layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_at_start_is_accepted() {
        assert!(sniff_header(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n").is_ok());
    }

    #[test]
    fn header_after_leading_junk_is_accepted() {
        let mut bytes = vec![0u8; 200];
        bytes.extend_from_slice(b"%PDF-1.4\n");
        assert!(sniff_header(&bytes).is_ok());
    }

    #[test]
    fn text_file_is_a_parse_error() {
        let err = sniff_header(b"Hello, this is a plain text file.\n").unwrap_err();
        assert!(matches!(err, RasterError::Parse(_)));
        assert!(err.to_string().contains("not a PDF"));
    }

    #[test]
    fn empty_and_tiny_inputs_are_parse_errors() {
        assert!(matches!(sniff_header(b""), Err(RasterError::Parse(_))));
        assert!(matches!(sniff_header(b"%P"), Err(RasterError::Parse(_))));
    }

    #[test]
    fn header_beyond_window_is_rejected() {
        let mut bytes = vec![b' '; HEADER_SEARCH_WINDOW];
        bytes.extend_from_slice(b"%PDF-1.4\n");
        assert!(sniff_header(&bytes).is_err());
    }
}
