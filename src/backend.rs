//! Process-wide pdfium backend.
//!
//! pdfium keeps global library state and `pdfium-render` serialises calls
//! into it, so the backend is modelled as:
//!
//! * a one-time [`init`] that resolves the native library and proves it
//!   binds, cached in a [`OnceLock`] for the life of the process, and
//! * short-lived [`Session`]s, each holding the process-wide render lock and
//!   its own [`Pdfium`] instance. A session is opened per request and every
//!   document and surface created under it is dropped before it ends.
//!
//! This module is the only place that knows how pdfium is found; the rest of
//! the crate sees a [`Session`] and nothing else.

use crate::error::{RasterError, ToolError};
use crate::pipeline::document::DocumentHandle;
use pdfium_locate::{LocateError, LocatedLibrary};
use pdfium_render::prelude::Pdfium;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::{debug, info};

static BACKEND: OnceLock<Backend> = OnceLock::new();
static RENDER_LOCK: Mutex<()> = Mutex::new(());

/// A located and verified pdfium library.
#[derive(Debug)]
pub struct Backend {
    library: LocatedLibrary,
}

/// Resolve and verify the pdfium library once per process.
///
/// Idempotent: after the first success every call returns the same backend
/// and `explicit` is ignored. A failed attempt is not cached, so a caller may
/// retry after fixing the environment.
pub fn init(explicit: Option<&Path>) -> Result<&'static Backend, ToolError> {
    if let Some(backend) = BACKEND.get() {
        return Ok(backend);
    }

    let library =
        pdfium_locate::locate_library(explicit).map_err(|e| ToolError::Backend(e.to_string()))?;

    // Prove the library actually loads before declaring the backend ready.
    {
        let _guard = lock();
        library.bind().map_err(|e| ToolError::Backend(e.to_string()))?;
    }
    info!("PDFium backend ready: {}", library);

    Ok(BACKEND.get_or_init(|| Backend { library }))
}

fn lock() -> MutexGuard<'static, ()> {
    // A panic inside a previous session leaves no state behind the lock.
    RENDER_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Backend {
    /// Open an exclusive session. Blocks while another session is active.
    pub fn session(&self) -> Result<Session, LocateError> {
        let guard = lock();
        let pdfium = self.library.bind()?;
        debug!("pdfium session opened");
        Ok(Session {
            pdfium,
            _guard: guard,
        })
    }
}

/// Exclusive access to pdfium for the duration of one request.
///
/// Field order matters: `pdfium` is dropped before the lock is released.
pub struct Session {
    pdfium: Pdfium,
    _guard: MutexGuard<'static, ()>,
}

impl Session {
    /// Parse `bytes` into a document bound to this session.
    pub fn load(
        &self,
        bytes: Vec<u8>,
        password: Option<&str>,
    ) -> Result<DocumentHandle<'_>, RasterError> {
        DocumentHandle::load(&self.pdfium, bytes, password)
    }
}
