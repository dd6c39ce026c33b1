//! # pdfium-locate
//!
//! Find a [PDFium](https://pdfium.googlesource.com/pdfium/) shared library on
//! the local machine and bind [`pdfium_render`] to it.
//!
//! Resolution is purely local: nothing in [`locate_library`] touches the
//! network. A copy of the library can be placed in the cache ahead of time
//! with [`fetch_library`], which is the only function in this crate that
//! performs HTTP requests.
//!
//! ## Search order
//!
//! 1. An explicit path handed to [`locate_library`] (authoritative: a missing
//!    file is an error, not a fallthrough).
//! 2. `PDFIUM_LIB_PATH`.
//! 3. The cache directory, see [`cache_dir`].
//! 4. The directory containing the running executable.
//! 5. The operating system's library search path.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pdfium_locate::locate_library;
//!
//! let library = locate_library(None).expect("no pdfium found");
//! let pdfium = library.bind().expect("bind failed");
//! # drop(pdfium);
//! ```
//!
//! ## Environment variables
//!
//! - `PDFIUM_LIB_PATH`: path to an existing pdfium library.
//! - `PDFIUM_LOCATE_CACHE_DIR`: override the base cache directory.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use pdfium_render::prelude::Pdfium;
use thiserror::Error;

/// The pdfium-binaries release tag fetched by [`fetch_library`].
pub const PDFIUM_VERSION: &str = "7690";

const RELEASES_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

const ENV_LIB_PATH: &str = "PDFIUM_LIB_PATH";
const ENV_CACHE_DIR: &str = "PDFIUM_LOCATE_CACHE_DIR";

/// Errors returned while locating, binding, or fetching pdfium.
#[derive(Error, Debug)]
pub enum LocateError {
    /// No prebuilt pdfium exists for this OS/architecture.
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// An explicitly requested library file does not exist.
    #[error("PDFium library not found at '{}'", path.display())]
    NotFound { path: PathBuf },

    /// The cache directory could not be created or written.
    #[error("Cache directory error: {0}")]
    CacheDir(#[source] std::io::Error),

    /// The release archive could not be downloaded.
    #[error("Download failed: {0}")]
    Download(String),

    /// The release archive could not be unpacked.
    #[error("Archive extraction failed: {0}")]
    Extract(String),

    /// The library was found but could not be loaded.
    #[error("Failed to bind PDFium from {origin}: {reason}")]
    Bind { origin: String, reason: String },
}

/// Where a located library came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibrarySource {
    Explicit,
    Environment,
    Cache,
    ExecutableDir,
    System,
}

/// A pdfium library that was found but not yet bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedLibrary {
    source: LibrarySource,
    /// `None` for [`LibrarySource::System`]: the dynamic loader picks the file.
    path: Option<PathBuf>,
}

impl LocatedLibrary {
    pub fn source(&self) -> LibrarySource {
        self.source
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Load the library and create a fresh [`Pdfium`] instance.
    ///
    /// Every call performs a new bind; the dynamic loader reuses the already
    /// mapped library after the first one.
    pub fn bind(&self) -> Result<Pdfium, LocateError> {
        let bindings = match &self.path {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_system_library(),
        };
        bindings.map(Pdfium::new).map_err(|e| LocateError::Bind {
            origin: self.to_string(),
            reason: format!("{e:?}"),
        })
    }
}

impl fmt::Display for LocatedLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.path, self.source) {
            (Some(path), source) => write!(f, "'{}' ({source:?})", path.display()),
            (None, _) => f.write_str("the system library path"),
        }
    }
}

// ── Platform metadata ────────────────────────────────────────────────────────

struct Platform {
    /// Release asset, e.g. `pdfium-linux-x64.tgz`.
    archive: &'static str,
    /// Member path inside the archive.
    member: &'static str,
    /// File name of the library on disk.
    lib_name: &'static str,
}

const LIB_DYLIB: (&str, &str) = ("lib/libpdfium.dylib", "libpdfium.dylib");
const LIB_SO: (&str, &str) = ("lib/libpdfium.so", "libpdfium.so");
const LIB_DLL: (&str, &str) = ("bin/pdfium.dll", "pdfium.dll");

fn platform_for(os: &str, arch: &str) -> Result<Platform, LocateError> {
    let (archive, (member, lib_name)) = match (os, arch) {
        ("macos", "aarch64") => ("pdfium-mac-arm64.tgz", LIB_DYLIB),
        ("macos", "x86_64") => ("pdfium-mac-x64.tgz", LIB_DYLIB),
        ("linux", "x86_64") => ("pdfium-linux-x64.tgz", LIB_SO),
        ("linux", "aarch64") => ("pdfium-linux-arm64.tgz", LIB_SO),
        ("windows", "x86_64") => ("pdfium-win-x64.tgz", LIB_DLL),
        ("windows", "aarch64") => ("pdfium-win-arm64.tgz", LIB_DLL),
        ("windows", "x86") => ("pdfium-win-x86.tgz", LIB_DLL),
        (os, arch) => {
            return Err(LocateError::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            })
        }
    };
    Ok(Platform {
        archive,
        member,
        lib_name,
    })
}

fn current_platform() -> Result<Platform, LocateError> {
    platform_for(std::env::consts::OS, std::env::consts::ARCH)
}

// ── Cache directory ──────────────────────────────────────────────────────────

/// Per-version cache directory holding a fetched pdfium library.
///
/// `{base}/pdf2md-mcp/pdfium-{VERSION}` where `base` is
/// `PDFIUM_LOCATE_CACHE_DIR` when set, else the platform cache directory.
pub fn cache_dir() -> PathBuf {
    let base = std::env::var_os(ENV_CACHE_DIR)
        .map(PathBuf::from)
        .or_else(dirs::cache_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir);
    versioned_dir(&base)
}

fn versioned_dir(base: &Path) -> PathBuf {
    base.join("pdf2md-mcp")
        .join(format!("pdfium-{PDFIUM_VERSION}"))
}

// ── Local resolution ─────────────────────────────────────────────────────────

/// Find a pdfium library without touching the network.
///
/// Falls back to [`LibrarySource::System`] when no file candidate exists;
/// whether the system loader can actually find one is only known at
/// [`LocatedLibrary::bind`] time.
pub fn locate_library(explicit: Option<&Path>) -> Result<LocatedLibrary, LocateError> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(LocateError::NotFound {
                path: path.to_path_buf(),
            });
        }
        return Ok(LocatedLibrary {
            source: LibrarySource::Explicit,
            path: Some(path.to_path_buf()),
        });
    }

    let mut candidates = Vec::new();
    if let Some(env_path) = std::env::var_os(ENV_LIB_PATH) {
        candidates.push((LibrarySource::Environment, PathBuf::from(env_path)));
    }
    if let Ok(platform) = current_platform() {
        candidates.push((LibrarySource::Cache, cache_dir().join(platform.lib_name)));
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            candidates.push((LibrarySource::ExecutableDir, exe_dir.join(platform.lib_name)));
        }
    }

    Ok(first_existing(candidates).unwrap_or(LocatedLibrary {
        source: LibrarySource::System,
        path: None,
    }))
}

fn first_existing(candidates: Vec<(LibrarySource, PathBuf)>) -> Option<LocatedLibrary> {
    candidates
        .into_iter()
        .find(|(_, path)| path.is_file())
        .map(|(source, path)| LocatedLibrary {
            source,
            path: Some(path),
        })
}

// ── Fetching ─────────────────────────────────────────────────────────────────

/// Download the platform pdfium library into [`cache_dir`], unless present.
///
/// `on_progress` receives `(bytes_downloaded, total_bytes)` while the archive
/// streams in. Returns the path of the cached library.
pub fn fetch_library(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, LocateError> {
    let platform = current_platform()?;
    let dir = cache_dir();
    let lib_path = dir.join(platform.lib_name);
    if lib_path.is_file() {
        return Ok(lib_path);
    }

    std::fs::create_dir_all(&dir).map_err(LocateError::CacheDir)?;

    let url = format!(
        "{RELEASES_URL}/chromium%2F{PDFIUM_VERSION}/{}",
        platform.archive
    );
    let archive = download(&url, on_progress)?;

    // Unpack next to the final name, then rename, so a crash mid-write never
    // leaves a truncated library that `locate_library` would pick up.
    let partial = dir.join(format!("{}.partial", platform.lib_name));
    unpack_member(&archive, platform.member, &partial)?;
    std::fs::rename(&partial, &lib_path).map_err(LocateError::CacheDir)?;

    Ok(lib_path)
}

fn download(
    url: &str,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Vec<u8>, LocateError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdfium-locate/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| LocateError::Download(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| LocateError::Download(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(LocateError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let total = response.content_length();
    let mut buf = Vec::with_capacity(total.unwrap_or(32 * 1024 * 1024) as usize);
    let mut chunk = [0u8; 64 * 1024];
    let mut received: u64 = 0;

    loop {
        let n = match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(LocateError::Download(format!("read error: {e}"))),
        };
        buf.extend_from_slice(&chunk[..n]);
        received += n as u64;
        if let Some(cb) = on_progress {
            cb(received, total);
        }
    }

    Ok(buf)
}

fn unpack_member(archive: &[u8], member: &str, dest: &Path) -> Result<(), LocateError> {
    use flate2::read::GzDecoder;
    use tar::Archive;

    let extract_err = |e: std::io::Error| LocateError::Extract(e.to_string());
    let mut archive = Archive::new(GzDecoder::new(archive));

    for entry in archive.entries().map_err(extract_err)? {
        let mut entry = entry.map_err(extract_err)?;
        if entry.path().map_err(extract_err)?.as_ref() == Path::new(member) {
            entry
                .unpack(dest)
                .map_err(|e| LocateError::Extract(format!("unpack failed: {e}")))?;
            return Ok(());
        }
    }

    Err(LocateError::Extract(format!(
        "'{member}' not found in archive"
    )))
}
