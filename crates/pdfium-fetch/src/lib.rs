//! # pdfium-fetch
//!
//! Process-wide location of the [PDFium](https://pdfium.googlesource.com/pdfium/)
//! shared library used by `pdfium-render`.
//!
//! The library path is resolved **once** per process and never changes
//! afterwards. Resolution order:
//!
//! 1. `PDFIUM_LIB_PATH` pointing at an existing file.
//! 2. A previously downloaded copy in [`cache_dir`].
//! 3. A fresh download of the platform archive from
//!    [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries),
//!    unpacked into [`cache_dir`].
//!
//! ```rust,no_run
//! // At process start (optionally with a download progress hook):
//! let path = pdfium_fetch::init_library(None).expect("PDFium unavailable");
//! eprintln!("using {}", path.display());
//!
//! // Anywhere later, on any thread:
//! let pdfium = pdfium_fetch::bind().expect("bind failed");
//! # drop(pdfium);
//! ```
//!
//! ## Environment variables
//!
//! - `PDFIUM_LIB_PATH` — use this library file; never download.
//! - `PDFIUM_FETCH_CACHE_DIR` — base directory for the download cache.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pdfium_render::prelude::Pdfium;
use thiserror::Error;

/// pdfium-binaries release tag (`chromium/<N>`) downloaded by this crate.
pub const PDFIUM_RELEASE: &str = "7690";

const RELEASES_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Download progress hook: `(bytes_received, content_length)`.
pub type DownloadProgress<'a> = &'a dyn Fn(u64, Option<u64>);

#[derive(Error, Debug)]
pub enum PdfiumFetchError {
    #[error("No PDFium build published for {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Cannot prepare cache directory '{path}': {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Download of '{url}' failed: {reason}")]
    Download { url: String, reason: String },

    #[error("Cannot unpack '{member}' from the PDFium archive: {reason}")]
    Unpack { member: String, reason: String },

    #[error("Failed to bind PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },
}

/// Where the library path came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibrarySource {
    /// `PDFIUM_LIB_PATH` override.
    Override(PathBuf),
    /// Already present in the download cache.
    Cached(PathBuf),
    /// Downloaded during this call.
    Downloaded(PathBuf),
}

impl LibrarySource {
    pub fn path(&self) -> &Path {
        match self {
            LibrarySource::Override(p)
            | LibrarySource::Cached(p)
            | LibrarySource::Downloaded(p) => p,
        }
    }
}

// ── Platform assets ──────────────────────────────────────────────────────────

struct Asset {
    os: &'static str,
    arch: &'static str,
    archive: &'static str,
    member: &'static str,
}

impl Asset {
    fn file_name(&self) -> &'static str {
        self.member.rsplit('/').next().unwrap_or(self.member)
    }
}

const ASSETS: &[Asset] = &[
    Asset {
        os: "macos",
        arch: "aarch64",
        archive: "pdfium-mac-arm64.tgz",
        member: "lib/libpdfium.dylib",
    },
    Asset {
        os: "macos",
        arch: "x86_64",
        archive: "pdfium-mac-x64.tgz",
        member: "lib/libpdfium.dylib",
    },
    Asset {
        os: "linux",
        arch: "x86_64",
        archive: "pdfium-linux-x64.tgz",
        member: "lib/libpdfium.so",
    },
    Asset {
        os: "linux",
        arch: "aarch64",
        archive: "pdfium-linux-arm64.tgz",
        member: "lib/libpdfium.so",
    },
    Asset {
        os: "windows",
        arch: "x86_64",
        archive: "pdfium-win-x64.tgz",
        member: "bin/pdfium.dll",
    },
    Asset {
        os: "windows",
        arch: "aarch64",
        archive: "pdfium-win-arm64.tgz",
        member: "bin/pdfium.dll",
    },
    Asset {
        os: "windows",
        arch: "x86",
        archive: "pdfium-win-x86.tgz",
        member: "bin/pdfium.dll",
    },
];

fn asset_for(os: &str, arch: &str) -> Result<&'static Asset, PdfiumFetchError> {
    ASSETS
        .iter()
        .find(|a| a.os == os && a.arch == arch)
        .ok_or_else(|| PdfiumFetchError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        })
}

fn current_asset() -> Result<&'static Asset, PdfiumFetchError> {
    asset_for(std::env::consts::OS, std::env::consts::ARCH)
}

// ── Cache ────────────────────────────────────────────────────────────────────

/// Per-release cache directory, e.g. `~/.cache/pdf2img/pdfium-7690/` on Linux.
pub fn cache_dir() -> PathBuf {
    let base = match std::env::var_os("PDFIUM_FETCH_CACHE_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
            .unwrap_or_else(std::env::temp_dir)
            .join("pdf2img"),
    };
    base.join(format!("pdfium-{PDFIUM_RELEASE}"))
}

fn env_override() -> Option<PathBuf> {
    std::env::var_os("PDFIUM_LIB_PATH")
        .map(PathBuf::from)
        .filter(|p| p.is_file())
}

/// Resolve the library without touching the network. `None` means a download is needed.
pub fn find_library() -> Option<LibrarySource> {
    if let Some(p) = env_override() {
        return Some(LibrarySource::Override(p));
    }
    let asset = current_asset().ok()?;
    let cached = cache_dir().join(asset.file_name());
    cached.is_file().then_some(LibrarySource::Cached(cached))
}

/// Resolve the library, downloading it into [`cache_dir`] when absent.
pub fn locate_library(
    progress: Option<DownloadProgress<'_>>,
) -> Result<LibrarySource, PdfiumFetchError> {
    if let Some(found) = find_library() {
        return Ok(found);
    }

    let asset = current_asset()?;
    let dir = cache_dir();
    std::fs::create_dir_all(&dir).map_err(|source| PdfiumFetchError::Cache {
        path: dir.clone(),
        source,
    })?;

    let url = format!("{RELEASES_URL}/chromium%2F{PDFIUM_RELEASE}/{}", asset.archive);
    let archive = download(&url, progress)?;
    let dest = dir.join(asset.file_name());
    unpack_member(&archive, asset.member, &dest)?;

    Ok(LibrarySource::Downloaded(dest))
}

// ── Process-wide state ───────────────────────────────────────────────────────

static LIBRARY: OnceLock<PathBuf> = OnceLock::new();

/// Resolve the library path once for this process and return it.
///
/// Later calls return the first resolved path without re-checking the
/// environment. Safe to call from several threads; a lost race only costs a
/// duplicate lookup.
pub fn init_library(
    progress: Option<DownloadProgress<'_>>,
) -> Result<&'static Path, PdfiumFetchError> {
    if let Some(path) = LIBRARY.get() {
        return Ok(path.as_path());
    }
    let source = locate_library(progress)?;
    Ok(LIBRARY
        .get_or_init(|| source.path().to_path_buf())
        .as_path())
}

/// The library path chosen by [`init_library`], if it has run.
pub fn library_path() -> Option<&'static Path> {
    LIBRARY.get().map(PathBuf::as_path)
}

/// Bind to PDFium, initialising the library path silently on first use.
pub fn bind() -> Result<Pdfium, PdfiumFetchError> {
    let path = init_library(None)?;
    bind_from(path)
}

/// Bind to the PDFium library at `path`, bypassing the process-wide state.
pub fn bind_from(path: &Path) -> Result<Pdfium, PdfiumFetchError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| PdfiumFetchError::Bind {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

// ── Download & unpack ────────────────────────────────────────────────────────

fn download(
    url: &str,
    progress: Option<DownloadProgress<'_>>,
) -> Result<Vec<u8>, PdfiumFetchError> {
    let failed = |reason: String| PdfiumFetchError::Download {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdfium-fetch/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let mut response = client.get(url).send().map_err(|e| failed(e.to_string()))?;
    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let total = response.content_length();
    let mut body = Vec::with_capacity(total.unwrap_or(32 << 20) as usize);
    let mut chunk = [0u8; 64 * 1024];
    loop {
        let n = match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(failed(e.to_string())),
        };
        body.extend_from_slice(&chunk[..n]);
        if let Some(report) = progress {
            report(body.len() as u64, total);
        }
    }
    Ok(body)
}

fn unpack_member(archive: &[u8], member: &str, dest: &Path) -> Result<(), PdfiumFetchError> {
    use flate2::read::GzDecoder;
    use tar::Archive;

    let unpack_err = |reason: String| PdfiumFetchError::Unpack {
        member: member.to_string(),
        reason,
    };

    let mut tar = Archive::new(GzDecoder::new(archive));
    for entry in tar.entries().map_err(|e| unpack_err(e.to_string()))? {
        let mut entry = entry.map_err(|e| unpack_err(e.to_string()))?;
        let matches = entry
            .path()
            .map(|p| p.to_string_lossy() == member)
            .map_err(|e| unpack_err(e.to_string()))?;
        if matches {
            entry.unpack(dest).map_err(|e| unpack_err(e.to_string()))?;
            return Ok(());
        }
    }
    Err(unpack_err("not present in archive".to_string()))
}
