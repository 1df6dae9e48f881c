//! Error types for the edgequake-pdf2img library.
//!
//! Two error types mirror the two layers of the crate:
//!
//! * [`Pdf2ImgError`] — **Fatal** for a conversion run: bad input, a document
//!   that cannot be decoded, an empty page selection, or a page that failed
//!   to render. A run that fails returns no artifacts at all.
//!
//! * [`BackendError`] — what a [`crate::pipeline::backend::RenderBackend`]
//!   reports. The pipeline decides which of these are fatal: text extraction
//!   failures are logged and absorbed, everything else is mapped onto a
//!   [`Pdf2ImgError`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2img library.
#[derive(Debug, Error)]
pub enum Pdf2ImgError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read, but they are not a PDF.
    #[error("'{name}' is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { name: String, magic: [u8; 4] },

    // ── Document errors ───────────────────────────────────────────────────
    /// The document could not be opened or re-opened from its bytes.
    #[error("PDF '{name}' could not be decoded: {detail}\nRe-select the file and try again.")]
    CorruptPdf { name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{name}'")]
    WrongPassword { name: String },

    // ── Selection errors ──────────────────────────────────────────────────
    /// The page range resolved to no pages of the document.
    #[error("Page range '{expression}' selects no pages (document has {total} pages)")]
    NoPagesSelected { expression: String, total: usize },

    // ── Render errors ─────────────────────────────────────────────────────
    /// A selected page could not be opened, rasterised or encoded.
    /// The whole run is abandoned; no partial output is returned.
    #[error("Rendering failed on page {page}: {detail}")]
    RenderFailed { page: usize, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output image file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Summary provider errors ───────────────────────────────────────────
    /// No LLM provider could be created for document summaries.
    #[error("LLM provider '{provider}' is not configured: {hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
If the download failed, you can:\n\
  • Check your internet connection and try again.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2ImgError {
    /// Validation failures leave previously converted artifacts in place;
    /// the user only needs to adjust the page range.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Pdf2ImgError::NoPagesSelected { .. } | Pdf2ImgError::InvalidConfig(_)
        )
    }

    /// The page number a render failure refers to, if any.
    pub fn failed_page(&self) -> Option<usize> {
        match self {
            Pdf2ImgError::RenderFailed { page, .. } => Some(*page),
            _ => None,
        }
    }
}

/// Failure reported by a rendering backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The document bytes could not be decoded.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The document is encrypted and no password was supplied.
    #[error("password required")]
    PasswordRequired,

    /// The supplied password was rejected.
    #[error("wrong password")]
    WrongPassword,

    /// A page could not be opened.
    #[error("page {page} could not be opened: {detail}")]
    Page { page: usize, detail: String },

    /// Rasterisation of an opened page failed.
    #[error("page {page} could not be rendered: {detail}")]
    Render { page: usize, detail: String },

    /// Text extraction failed. Never fatal to a conversion.
    #[error("text extraction failed on page {page}: {detail}")]
    Extract { page: usize, detail: String },
}
