//! Eager (whole-run) conversion entry points.
//!
//! These functions wait for every selected page and return the full
//! [`ConversionOutput`]. Use [`crate::stream::convert_stream`] instead when
//! pages should be shown as they are produced.
//!
//! The sequential page loop is blocking work, so it runs inside
//! `tokio::task::spawn_blocking`. The rendering backend is created on that
//! blocking thread and dropped there, which also releases the decoded
//! document on every exit path.

use crate::config::ConversionSettings;
use crate::error::Pdf2ImgError;
use crate::output::{ConversionOutcome, ConversionOutput, DocumentMetadata, PageArtifact};
use crate::pipeline::backend::{PdfiumBackend, RenderBackend};
use crate::pipeline::input::{self, SourceDocument};
use crate::pipeline::render;
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::run::RunToken;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Convert the pages of `source` selected by `settings`, using PDFium.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// - [`Pdf2ImgError::CorruptPdf`] / `PasswordRequired` / `WrongPassword`
///   if the document cannot be decoded
/// - [`Pdf2ImgError::NoPagesSelected`] if the page range selects nothing
/// - [`Pdf2ImgError::RenderFailed`] naming the first page that failed;
///   no partial output is returned
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2img::{convert, resolve_input, ConversionSettings};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let source = resolve_input("report.pdf", 60).await?;
/// let settings = ConversionSettings::builder().page_range("1-3").build()?;
/// let output = convert(&source, &settings, None).await?;
/// println!("{} pages, text: {}", output.artifacts.len(), output.extracted_text);
/// # Ok(())
/// # }
/// ```
pub async fn convert(
    source: &SourceDocument,
    settings: &ConversionSettings,
    progress: Option<ProgressCallback>,
) -> Result<ConversionOutput, Pdf2ImgError> {
    convert_with_backend(
        PdfiumBackend::bind,
        source,
        settings,
        progress,
        RunToken::detached(),
    )
    .await?
    .completed()
    .ok_or_else(|| Pdf2ImgError::Internal("detached run reported supersession".to_string()))
}

/// Convert with a caller-supplied backend and run token.
///
/// `make_backend` is invoked on the blocking thread that performs the run,
/// so the backend itself does not need to be `Send`. Returns
/// [`ConversionOutcome::Superseded`] if `token` is superseded mid-run.
pub async fn convert_with_backend<B, F>(
    make_backend: F,
    source: &SourceDocument,
    settings: &ConversionSettings,
    progress: Option<ProgressCallback>,
    token: RunToken,
) -> Result<ConversionOutcome, Pdf2ImgError>
where
    B: RenderBackend,
    F: FnOnce() -> Result<B, Pdf2ImgError> + Send + 'static,
{
    info!("Starting conversion: {} (run {})", source.name(), token.id());
    let source = source.clone();
    let settings = settings.clone();
    let progress: ProgressCallback = progress.unwrap_or_else(|| Arc::new(NoopProgressCallback));

    tokio::task::spawn_blocking(move || {
        let backend = make_backend()?;
        render::run_conversion(&backend, &source, &settings, progress.as_ref(), &token)
    })
    .await
    .map_err(|e| Pdf2ImgError::Internal(format!("Conversion task panicked: {}", e)))?
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    source: &SourceDocument,
    settings: &ConversionSettings,
) -> Result<ConversionOutput, Pdf2ImgError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2ImgError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(source, settings, None))
}

/// Resolve `input` (path or URL), convert it, and write one image file per
/// page into `output_dir`.
///
/// Returns the output together with the paths written, in page order.
pub async fn convert_to_dir(
    input_str: impl AsRef<str>,
    output_dir: impl AsRef<Path>,
    settings: &ConversionSettings,
    progress: Option<ProgressCallback>,
) -> Result<(ConversionOutput, Vec<PathBuf>), Pdf2ImgError> {
    let source = input::resolve_input(input_str.as_ref(), 120).await?;
    let output = convert(&source, settings, progress).await?;
    let paths = write_artifacts(&output.artifacts, output_dir.as_ref(), &source.stem()).await?;
    Ok((output, paths))
}

/// Write each artifact to `dir` as `{stem}-page-{n}.{ext}`.
///
/// Uses atomic write (temp file + rename) so a reader never sees a
/// half-written image.
pub async fn write_artifacts(
    artifacts: &[PageArtifact],
    dir: &Path,
    stem: &str,
) -> Result<Vec<PathBuf>, Pdf2ImgError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Pdf2ImgError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let mut written = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let path = dir.join(artifact.file_name(stem));
        let tmp_path = path.with_extension(format!("{}.tmp", artifact.format.extension()));

        tokio::fs::write(&tmp_path, &artifact.data)
            .await
            .map_err(|e| Pdf2ImgError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| Pdf2ImgError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        debug!("Wrote {} ({} bytes)", path.display(), artifact.byte_len());
        written.push(path);
    }

    Ok(written)
}

/// Page count and metadata without rendering any page.
pub async fn inspect(source: &SourceDocument) -> Result<DocumentMetadata, Pdf2ImgError> {
    inspect_with_backend(PdfiumBackend::bind, source).await
}

/// [`inspect`] with a caller-supplied backend.
pub async fn inspect_with_backend<B, F>(
    make_backend: F,
    source: &SourceDocument,
) -> Result<DocumentMetadata, Pdf2ImgError>
where
    B: RenderBackend,
    F: FnOnce() -> Result<B, Pdf2ImgError> + Send + 'static,
{
    let source = source.clone();
    tokio::task::spawn_blocking(move || -> Result<DocumentMetadata, Pdf2ImgError> {
        let backend = make_backend()?;
        let document = render::open_source(&backend, &source)?;
        Ok(document.metadata())
    })
    .await
    .map_err(|e| Pdf2ImgError::Internal(format!("Metadata task panicked: {}", e)))?
}
