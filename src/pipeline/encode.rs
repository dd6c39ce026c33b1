//! The rasteriser's output: a PNG byte buffer.
//!
//! PNG is lossless, so rendered glyph edges reach the vision model exactly as
//! pdfium drew them. JPEG ringing around small text measurably hurts
//! transcription accuracy. The endpoint receives the bytes as a base64
//! `data:` URI embedded in the JSON request body.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// The eight-byte signature every PNG stream starts with.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// A non-empty, PNG-signed byte buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    bytes: Vec<u8>,
}

impl ImageBuffer {
    /// Wrap encoded PNG bytes, checking the signature.
    pub fn from_png(bytes: Vec<u8>) -> Result<Self, String> {
        if bytes.len() <= PNG_SIGNATURE.len() || bytes[..8] != PNG_SIGNATURE {
            return Err(format!(
                "encoder produced {} bytes without a PNG signature",
                bytes.len()
            ));
        }
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `data:image/png;base64,…` form accepted by multimodal chat APIs.
    pub fn to_data_uri(&self) -> String {
        let b64 = STANDARD.encode(&self.bytes);
        debug!("Encoded image → {} bytes base64", b64.len());
        format!("data:image/png;base64,{b64}")
    }
}

impl std::fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("len", &self.bytes.len())
            .finish()
    }
}
