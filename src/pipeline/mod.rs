//! Pipeline stages for single-page PDF-to-Markdown conversion.
//!
//! Each submodule implements one step so the rasterisation core can be
//! tested without a network and the network half without pdfium.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ document ──▶ render ──▶ encode ──▶ vision ──▶ postprocess
//! (bytes)   (pdfium)    (surface)   (PNG)     (HTTP)     (cleanup)
//! ```
//!
//! 1. [`input`]: validate the path and read the file (the only disk I/O)
//! 2. [`document`]: parse bytes into a page-addressable [`document::DocumentHandle`]
//! 3. [`render`]: validate the page number, compute the [`geometry::Viewport`],
//!    paint a white [`surface::DrawingSurface`], draw the page onto it;
//!    runs in `spawn_blocking` because pdfium is not async-safe
//! 4. [`encode`]: PNG [`encode::ImageBuffer`] and its base64 data URI
//! 5. [`vision`]: one call to the transcription endpoint
//! 6. [`postprocess`]: deterministic cleanup of model quirks

pub mod document;
pub mod encode;
pub mod geometry;
pub mod input;
pub mod postprocess;
pub mod render;
pub mod surface;
pub mod vision;
