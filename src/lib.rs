//! # edgequake-pdf2img
//!
//! Convert selected pages of a PDF document to PNG or JPEG images.
//!
//! Pages are chosen with a forgiving range expression (`"1-5, 8, 10-12"`),
//! rendered one at a time through PDFium at a chosen scale, and encoded in
//! the requested format. Progress is reported once per page. A run is
//! all-or-nothing: if any selected page fails to render, no images are
//! returned. Text from the first three selected pages is extracted along the
//! way and can optionally be summarised by an LLM, without ever delaying the
//! conversion.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Input    read a local file or download from URL
//!  ├─ 2. Open     decode the document afresh for every run (spawn_blocking)
//!  ├─ 3. Resolve  range expression → sorted, de-duplicated page numbers
//!  ├─ 4. Render   page by page: open, sample text, rasterise, encode
//!  └─ 5. Output   artifacts + extracted text (+ optional summary, async)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2img::{convert, resolve_input, ConversionSettings, ImageFormat, PercentCallback};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = resolve_input("document.pdf", 60).await?;
//!     let settings = ConversionSettings::builder()
//!         .format(ImageFormat::Jpeg)
//!         .scale(2.0)
//!         .page_range("1-3, 7")
//!         .build()?;
//!     let progress = Arc::new(PercentCallback(|p: u8| eprintln!("{p}%")));
//!     let output = convert(&source, &settings, Some(progress)).await?;
//!     for artifact in &output.artifacts {
//!         std::fs::write(artifact.file_name(&source.stem()), &artifact.data)?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2img` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-pdf2img = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod range;
pub mod run;
pub mod session;
pub mod stream;
pub mod summarize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionSettings, ConversionSettingsBuilder, ImageFormat, MAX_SCALE, MIN_SCALE};
pub use convert::{
    convert, convert_sync, convert_to_dir, convert_with_backend, inspect, inspect_with_backend,
    write_artifacts,
};
pub use error::{BackendError, Pdf2ImgError};
pub use output::{
    ConversionOutcome, ConversionOutput, ConversionStats, DocumentMetadata, PageArtifact,
};
pub use pipeline::backend::{DocumentHandle, PageHandle, PdfiumBackend, RenderBackend, Viewport};
pub use pipeline::input::{resolve_input, SourceDocument};
pub use progress::{
    ConversionProgressCallback, NoopProgressCallback, PercentCallback, ProgressCallback,
};
pub use range::{resolve, PageRange};
pub use run::{RunToken, RunTracker};
pub use session::{ConversionSession, SessionState};
pub use stream::{convert_stream, convert_stream_with_backend, ConversionEvent};
pub use summarize::{dispatch_summary, DocumentAnalysis, LlmSummarizer, Summarizer};
