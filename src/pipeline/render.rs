//! Page rasterisation: one page of a loaded document → PNG [`ImageBuffer`].
//!
//! ## Order of operations
//!
//! 1. validate the page number (no document access before this succeeds)
//! 2. range-check against the page count
//! 3. page size → [`Viewport`] at the configured scale
//! 4. check the viewport against the surface pixel budget
//! 5. allocate a [`DrawingSurface`] (painted white on construction)
//! 6. draw the page onto it
//! 7. encode PNG
//!
//! Any failure discards the surface; there is no partial image.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is synchronous, CPU-bound and guarded by a process-wide lock.
//! [`rasterize_page`] moves load + render onto tokio's blocking pool so the
//! server's worker threads keep serving the protocol while a page renders.
//! The blocking task is not cancellable: dropping the future discards the
//! result once the task finishes.

use crate::backend;
use crate::config::RasterConfig;
use crate::error::{RasterError, ToolError};
use crate::pipeline::document::PageSource;
use crate::pipeline::encode::ImageBuffer;
use crate::pipeline::geometry::{PageNumber, Viewport};
use crate::pipeline::surface::DrawingSurface;
use std::time::Instant;
use tracing::{debug, info};

/// Render `page_number` of `source` to PNG.
///
/// `page_number` is validated before `source` is touched, so an invalid
/// number fails the same way whatever the document is.
pub fn render<S: PageSource + ?Sized>(
    source: &S,
    page_number: i64,
    config: &RasterConfig,
) -> Result<ImageBuffer, RasterError> {
    let page = PageNumber::new(page_number)?;
    render_page(source, page, config)
}

/// Render an already-validated page number.
pub fn render_page<S: PageSource + ?Sized>(
    source: &S,
    page: PageNumber,
    config: &RasterConfig,
) -> Result<ImageBuffer, RasterError> {
    let total = source.page_count();
    if page.index() >= total {
        return Err(RasterError::PageOutOfRange {
            page: page.get(),
            total,
        });
    }

    let size = source.page_size(page)?;
    let viewport = Viewport::new(page, size, config.scale)?;
    if viewport.pixel_count() > config.max_surface_pixels {
        return Err(RasterError::render(
            page.get(),
            format!(
                "viewport {} ({} px) exceeds the surface limit of {} px",
                viewport,
                viewport.pixel_count(),
                config.max_surface_pixels
            ),
        ));
    }
    debug!(
        "Page {}: {}×{} pt at scale {} → {}",
        page, size.width_pt, size.height_pt, config.scale, viewport
    );

    let mut surface = DrawingSurface::new(page, viewport);
    source.draw_page(page, &mut surface)?;
    surface.encode_png()
}

/// Load `bytes` with the process-wide pdfium backend and render one page.
///
/// The page number is checked before the backend is initialised or the bytes
/// are parsed.
pub async fn rasterize_page(
    bytes: Vec<u8>,
    page_number: i64,
    config: &RasterConfig,
) -> Result<ImageBuffer, ToolError> {
    let page = PageNumber::new(page_number)?;
    let backend = backend::init(config.pdfium_library.as_deref())?;
    let config = config.clone();

    let started = Instant::now();
    let png = tokio::task::spawn_blocking(move || -> Result<ImageBuffer, ToolError> {
        let session = backend
            .session()
            .map_err(|e| ToolError::Backend(e.to_string()))?;
        let document = session.load(bytes, config.password.as_deref())?;
        let png = render_page(&document, page, &config)?;
        Ok(png)
    })
    .await
    .map_err(|e| RasterError::render(page.get(), format!("render task panicked: {e}")))??;

    info!(
        "Rasterised page {} → {} bytes PNG in {:.0?}",
        page,
        png.len(),
        started.elapsed()
    );
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::PNG_SIGNATURE;
    use crate::pipeline::geometry::PageSize;
    use crate::pipeline::surface::BACKGROUND;
    use image::{Rgba, RgbaImage};
    use std::cell::Cell;

    /// In-memory document: every page is `size`, with a black square drawn
    /// in the top-left quarter. Counts how often it is touched.
    struct FakeDocument {
        pages: usize,
        size: (f32, f32),
        accesses: Cell<usize>,
        fail_draw: bool,
    }

    impl FakeDocument {
        fn new(pages: usize) -> Self {
            Self {
                pages,
                size: (40.0, 60.0),
                accesses: Cell::new(0),
                fail_draw: false,
            }
        }
    }

    impl PageSource for FakeDocument {
        fn page_count(&self) -> usize {
            self.accesses.set(self.accesses.get() + 1);
            self.pages
        }

        fn page_size(&self, page: PageNumber) -> Result<PageSize, RasterError> {
            self.accesses.set(self.accesses.get() + 1);
            PageSize::new(page, self.size.0, self.size.1)
        }

        fn draw_page(
            &self,
            page: PageNumber,
            surface: &mut DrawingSurface,
        ) -> Result<(), RasterError> {
            self.accesses.set(self.accesses.get() + 1);
            if self.fail_draw {
                return Err(RasterError::render(page.get(), "unsupported operator"));
            }
            let vp = surface.viewport();
            let mut layer = RgbaImage::from_pixel(vp.width_px, vp.height_px, Rgba([0, 0, 0, 0]));
            for x in 0..vp.width_px / 2 {
                for y in 0..vp.height_px / 2 {
                    layer.put_pixel(x, y, Rgba([0, 0, 0, 255]));
                }
            }
            surface.composite(&layer)
        }
    }

    fn decode(png: &ImageBuffer) -> RgbaImage {
        image::load_from_memory(png.as_bytes()).unwrap().to_rgba8()
    }

    #[test]
    fn invalid_page_number_never_touches_document() {
        let doc = FakeDocument::new(3);
        for bad in [0, -1, -100] {
            let err = render(&doc, bad, &RasterConfig::default()).unwrap_err();
            assert!(matches!(err, RasterError::InvalidArgument(_)), "{bad}: {err}");
        }
        assert_eq!(doc.accesses.get(), 0);
    }

    #[test]
    fn last_page_renders_and_next_is_out_of_range() {
        let doc = FakeDocument::new(3);
        let config = RasterConfig::default();

        assert!(render(&doc, 3, &config).is_ok());

        let err = render(&doc, 4, &config).unwrap_err();
        assert!(matches!(err, RasterError::PageOutOfRange { page: 4, total: 3 }));
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn output_is_png_at_scaled_size() {
        let doc = FakeDocument::new(1);
        let png = render(&doc, 1, &RasterConfig::default()).unwrap();

        assert!(!png.is_empty());
        assert_eq!(png.as_bytes()[..8], PNG_SIGNATURE);
        assert_eq!(decode(&png).dimensions(), (80, 120));
    }

    #[test]
    fn blank_regions_decode_to_opaque_white() {
        let doc = FakeDocument::new(1);
        let img = decode(&render(&doc, 1, &RasterConfig::default()).unwrap());

        assert_eq!(*img.get_pixel(79, 119), BACKGROUND);
        assert_eq!(*img.get_pixel(60, 10), BACKGROUND);
        assert_eq!(*img.get_pixel(5, 5), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn repeated_renders_are_byte_identical() {
        let doc = FakeDocument::new(2);
        let config = RasterConfig::default();
        let a = render(&doc, 2, &config).unwrap();
        let b = render(&doc, 2, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn scale_changes_output_size() {
        let doc = FakeDocument::new(1);
        let config = RasterConfig::builder().scale(1.0).build().unwrap();
        assert_eq!(decode(&render(&doc, 1, &config).unwrap()).dimensions(), (40, 60));
    }

    #[test]
    fn oversized_viewport_fails_before_drawing() {
        let doc = FakeDocument::new(1);
        let config = RasterConfig::builder()
            .max_surface_pixels(1000)
            .build()
            .unwrap();

        let err = render(&doc, 1, &config).unwrap_err();
        assert!(matches!(err, RasterError::Render { page: 1, .. }));
        assert!(err.to_string().contains("surface limit"));
        // page_count + page_size only; draw_page never ran
        assert_eq!(doc.accesses.get(), 2);
    }

    #[test]
    fn draw_failure_is_a_render_error() {
        let mut doc = FakeDocument::new(1);
        doc.fail_draw = true;
        let err = render(&doc, 1, &RasterConfig::default()).unwrap_err();
        assert!(err.to_string().contains("unsupported operator"));
    }

    #[tokio::test]
    async fn rasterize_validates_before_loading_backend() {
        let err = rasterize_page(b"not a pdf".to_vec(), 0, &RasterConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::Raster(RasterError::InvalidArgument(_))
        ));
    }
}
