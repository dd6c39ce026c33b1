//! Input resolution: turn a user-supplied path into PDF bytes.
//!
//! This is the only stage that touches the file system. Everything after it
//! works on an in-memory byte buffer, so the loader stays pure and
//! concurrent requests for the same file each parse their own copy.

use crate::error::ToolError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// How strictly a path argument is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPolicy {
    /// Relative paths resolve against the working directory (CLI use).
    AllowRelative,
    /// Only absolute paths are accepted (the server tool; its working
    /// directory is whatever the MCP client launched it in).
    RequireAbsolute,
}

/// Validate `path` without touching the file system.
pub fn check_path(path: &str, policy: PathPolicy) -> Result<PathBuf, ToolError> {
    if path.trim().is_empty() {
        return Err(ToolError::InvalidArgument(
            "pdf_path must be a non-empty string".into(),
        ));
    }
    let path = PathBuf::from(path);
    if policy == PathPolicy::RequireAbsolute && !path.is_absolute() {
        return Err(ToolError::InvalidArgument(format!(
            "pdf_path must be an absolute path, got '{}'",
            path.display()
        )));
    }
    Ok(path)
}

/// Check that `path` names a readable regular file.
pub async fn ensure_file(path: &Path) -> Result<(), ToolError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| io_error(path, e))?;
    if meta.is_dir() {
        return Err(ToolError::InvalidArgument(format!(
            "'{}' is a directory, not a PDF file",
            path.display()
        )));
    }
    Ok(())
}

/// Read the whole file at `path`.
pub async fn read_pdf(path: &Path) -> Result<Vec<u8>, ToolError> {
    ensure_file(path).await?;
    let bytes = tokio::fs::read(path).await.map_err(|e| io_error(path, e))?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

fn io_error(path: &Path, e: std::io::Error) -> ToolError {
    let path = path.to_path_buf();
    match e.kind() {
        ErrorKind::NotFound => ToolError::FileNotFound { path },
        ErrorKind::PermissionDenied => ToolError::PermissionDenied { path },
        _ => ToolError::Io { path, source: e },
    }
}
