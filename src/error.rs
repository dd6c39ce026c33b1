//! Error types for pdf2md-mcp.
//!
//! Three error types mirror the three layers a request passes through:
//!
//! * [`RasterError`]: the rasterisation core (loader + rasteriser). Every
//!   variant maps to one entry of the core taxonomy: malformed arguments,
//!   unparsable documents, out-of-range pages, and render failures.
//!
//! * [`VisionError`]: the external transcription endpoint failed or answered
//!   with something that is not a transcription.
//!
//! * [`ToolError`]: what the request boundary (server tool, CLI, `convert`
//!   functions) returns. It adds file-access and configuration failures and
//!   wraps the other two transparently so the underlying cause text is never
//!   lost when it is shown to a user.
//!
//! Nothing here is retryable by the library itself: PDF parsing is
//! deterministic, and the transcription call is made exactly once.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the loader and rasteriser.
#[derive(Debug, Error)]
pub enum RasterError {
    /// Malformed page number (zero, negative, fractional) or argument type.
    /// Raised before any document access.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The bytes are not a loadable PDF. Not retryable with the same bytes.
    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    /// The page number exceeds the document's page count.
    #[error("Invalid page number {page}. PDF has {total} pages.")]
    PageOutOfRange { page: u32, total: usize },

    /// Viewport, surface, draw, or encode failure. No partial image exists.
    #[error("Rasterisation failed for page {page}: {detail}")]
    Render { page: u32, detail: String },
}

impl RasterError {
    pub(crate) fn render(page: u32, detail: impl Into<String>) -> Self {
        RasterError::Render {
            page,
            detail: detail.into(),
        }
    }
}

/// Failures of the vision transcription endpoint.
#[derive(Debug, Error)]
pub enum VisionError {
    /// Connection, TLS, or request-building failure.
    #[error("Vision API request failed: {0}")]
    Transport(String),

    /// The endpoint did not answer within the configured timeout.
    #[error("Vision API request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Non-2xx status. `body` is the raw response text.
    #[error("Vision API request failed: {status} {reason} - {body}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },

    /// 2xx status but the body is not JSON.
    #[error("Vision API returned a malformed body: {0}")]
    MalformedBody(String),

    /// JSON body without a transcription field; carries the serialised body.
    #[error("Unexpected API response format: {0}")]
    UnexpectedResponse(String),

    /// The transcription field was present but blank.
    #[error("Vision API returned an empty transcription")]
    EmptyTranscription,
}

/// Errors surfaced at the request boundary.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Bad path argument (empty, relative where absolute is required, a directory).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("PDF file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Permission denied reading '{}'", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// pdfium could not be located or bound.
    #[error(
        "PDFium rendering backend unavailable: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, or run `pdf2md-mcp setup` once to fetch a copy."
    )]
    Backend(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The MCP transport failed to start or terminated abnormally.
    #[error("MCP server error: {0}")]
    Server(String),

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Vision(#[from] VisionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_out_of_range_reports_page_count() {
        let e = RasterError::PageOutOfRange { page: 4, total: 3 };
        let msg = e.to_string();
        assert!(msg.contains("PDF has 3 pages"), "got: {msg}");
        assert!(msg.contains('4'), "got: {msg}");
    }

    #[test]
    fn raster_errors_pass_through_tool_error() {
        let e: ToolError = RasterError::Parse("bad xref".into()).into();
        assert_eq!(e.to_string(), "Failed to parse PDF: bad xref");
    }

    #[test]
    fn status_error_keeps_body() {
        let e = VisionError::Status {
            status: 401,
            reason: "Unauthorized".into(),
            body: "invalid api key".into(),
        };
        let msg = ToolError::from(e).to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("invalid api key"));
    }

    #[test]
    fn file_not_found_names_path() {
        let e = ToolError::FileNotFound {
            path: PathBuf::from("/tmp/missing.pdf"),
        };
        assert_eq!(e.to_string(), "PDF file not found: /tmp/missing.pdf");
    }
}
