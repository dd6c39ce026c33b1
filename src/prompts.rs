//! Instruction text sent to the vision model.
//!
//! Kept in one place so the request builder in
//! [`crate::pipeline::vision`] stays free of prose, and so tests can check
//! the request body against the exact string. Callers override it through
//! [`crate::config::VisionConfig::prompt`].

/// Default instruction accompanying every page image.
pub const DEFAULT_TRANSCRIPTION_PROMPT: &str = "Please convert this image to markdown format. \
Extract all text, tables, and structure accurately.";
