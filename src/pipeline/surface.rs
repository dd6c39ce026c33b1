//! Off-screen drawing surface.
//!
//! PDF pages carry no background of their own. A renderer left to its
//! defaults produces transparent (or black, once flattened) margins, which a
//! vision model reads as content. The surface is therefore painted opaque
//! white the moment it is allocated, and page content is only ever
//! alpha-composited on top of it. Compositing over an opaque background
//! yields an opaque result, so every pixel keeps alpha 255.

use crate::error::RasterError;
use crate::pipeline::encode::ImageBuffer;
use crate::pipeline::geometry::{PageNumber, Viewport};
use image::{DynamicImage, Rgba, RgbaImage};
use std::io::Cursor;
use tracing::debug;

/// Opaque white, the colour every surface starts as.
pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// An RGBA canvas sized to a [`Viewport`], already filled with [`BACKGROUND`].
pub struct DrawingSurface {
    page: PageNumber,
    viewport: Viewport,
    canvas: RgbaImage,
}

impl DrawingSurface {
    /// Allocate a surface for `page` and paint it white.
    pub fn new(page: PageNumber, viewport: Viewport) -> Self {
        let canvas = RgbaImage::from_pixel(viewport.width_px, viewport.height_px, BACKGROUND);
        Self {
            page,
            viewport,
            canvas,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Source-over blend `layer` onto the surface.
    ///
    /// `layer` must match the viewport exactly; fully transparent pixels
    /// leave the white background untouched. Channels are rounded to the
    /// nearest value and alpha stays 255.
    pub fn composite(&mut self, layer: &RgbaImage) -> Result<(), RasterError> {
        if layer.dimensions() != self.canvas.dimensions() {
            return Err(RasterError::render(
                self.page.get(),
                format!(
                    "content layer is {}x{} but the surface is {}",
                    layer.width(),
                    layer.height(),
                    self.viewport
                ),
            ));
        }
        for (dst, src) in self.canvas.pixels_mut().zip(layer.pixels()) {
            *dst = blend_over_opaque(*dst, *src);
        }
        Ok(())
    }

    /// Read-only view of the pixels, for inspection in tests and tools.
    pub fn pixels(&self) -> &RgbaImage {
        &self.canvas
    }

    /// Encode the finished surface as PNG, consuming it.
    ///
    /// Every pixel is opaque, so the alpha channel carries no information and
    /// is dropped (RGB8 PNG).
    pub fn encode_png(self) -> Result<ImageBuffer, RasterError> {
        let page = self.page.get();
        let rgb = DynamicImage::ImageRgba8(self.canvas).into_rgb8();

        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(rgb)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| RasterError::render(page, format!("PNG encoding failed: {e}")))?;

        debug!("Encoded page {} → {} bytes PNG", page, buf.len());
        ImageBuffer::from_png(buf).map_err(|e| RasterError::render(page, e))
    }
}

/// Source-over of `src` onto an opaque `dst`.
fn blend_over_opaque(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let a = u32::from(src[3]);
    let mix = |s: u8, d: u8| ((u32::from(s) * a + u32::from(d) * (255 - a) + 127) / 255) as u8;
    Rgba([mix(src[0], dst[0]), mix(src[1], dst[1]), mix(src[2], dst[2]), 255])
}
