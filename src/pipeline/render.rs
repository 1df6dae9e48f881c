//! The sequential conversion loop: decode, resolve, then render page by page.
//!
//! Everything here is blocking. Callers run [`run_conversion`] inside
//! `tokio::task::spawn_blocking` (see [`crate::convert`]); the backend is
//! not safe for concurrent use, and rendering one page at a time bounds peak
//! memory to a single raster buffer.
//!
//! A run is all-or-nothing. The first render or encode failure aborts the
//! remaining pages and drops every artifact produced so far. Text extraction
//! is the exception: it only runs for the first [`TEXT_SAMPLE_PAGES`]
//! resolved pages and its failures are logged and absorbed.

use crate::config::ConversionSettings;
use crate::error::{BackendError, Pdf2ImgError};
use crate::output::{ConversionOutcome, ConversionOutput, ConversionStats, PageArtifact};
use crate::pipeline::backend::{DocumentHandle, RenderBackend};
use crate::pipeline::encode::encode_page;
use crate::pipeline::input::SourceDocument;
use crate::progress::{percent_complete, ConversionProgressCallback};
use crate::run::RunToken;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Text is sampled from this many leading pages of the resolved set.
pub const TEXT_SAMPLE_PAGES: usize = 3;

/// Ephemeral state of one run. Dropped on every exit path.
struct ConversionRun {
    pages: Vec<usize>,
    artifacts: Vec<PageArtifact>,
    text: String,
    extraction_failures: usize,
}

impl ConversionRun {
    fn new(pages: Vec<usize>) -> Self {
        let artifacts = Vec::with_capacity(pages.len());
        Self {
            pages,
            artifacts,
            text: String::new(),
            extraction_failures: 0,
        }
    }

    fn push_text(&mut self, text: &str) {
        self.text.push(' ');
        self.text.push_str(text);
    }
}

/// Open the document and map backend decode failures onto caller errors.
pub(crate) fn open_source<'a>(
    backend: &'a dyn RenderBackend,
    source: &'a SourceDocument,
) -> Result<Box<dyn DocumentHandle + 'a>, Pdf2ImgError> {
    backend
        .open_document(source.bytes(), source.password())
        .map_err(|e| match e {
            BackendError::PasswordRequired => Pdf2ImgError::PasswordRequired {
                name: source.name().to_string(),
            },
            BackendError::WrongPassword => Pdf2ImgError::WrongPassword {
                name: source.name().to_string(),
            },
            other => Pdf2ImgError::CorruptPdf {
                name: source.name().to_string(),
                detail: other.to_string(),
            },
        })
}

/// Convert the pages of `source` selected by `settings`.
///
/// Returns [`ConversionOutcome::Superseded`] without error if `token` stops
/// being current before the run finishes.
pub fn run_conversion(
    backend: &dyn RenderBackend,
    source: &SourceDocument,
    settings: &ConversionSettings,
    progress: &dyn ConversionProgressCallback,
    token: &RunToken,
) -> Result<ConversionOutcome, Pdf2ImgError> {
    let started = Instant::now();
    settings.validate()?;

    let document = open_source(backend, source)?;
    let total_pages = document.page_count();
    info!("PDF loaded: {} pages", total_pages);

    let range = settings.pages();
    if range.dropped() > 0 {
        debug!(
            "Ignored {} malformed token(s) in page range '{}'",
            range.dropped(),
            range.expression()
        );
    }
    let pages = range.resolve(total_pages);
    if pages.is_empty() {
        return Err(Pdf2ImgError::NoPagesSelected {
            expression: range.expression().to_string(),
            total: total_pages,
        });
    }

    let mut run = ConversionRun::new(pages);
    let selected = run.pages.len();
    let quality = settings.jpeg_quality();
    info!(
        "Converting {} of {} pages to {} at scale {}",
        selected, total_pages, settings.format, settings.scale
    );
    progress.on_conversion_start(selected);

    for i in 0..selected {
        if !token.is_current() {
            info!("Run {} superseded after {} page(s)", token.id(), i);
            return Ok(ConversionOutcome::Superseded);
        }
        let page_num = run.pages[i];

        let page = document
            .open_page(page_num)
            .map_err(|e| Pdf2ImgError::RenderFailed {
                page: page_num,
                detail: e.to_string(),
            })?;

        if i < TEXT_SAMPLE_PAGES {
            match page.extract_text() {
                Ok(text) => run.push_text(&text),
                Err(e) => {
                    warn!("Text extraction failed on page {}: {}", page_num, e);
                    run.extraction_failures += 1;
                }
            }
        }

        let viewport = page.viewport(settings.scale);
        let image = page
            .render(&viewport)
            .map_err(|e| Pdf2ImgError::RenderFailed {
                page: page_num,
                detail: e.to_string(),
            })?;

        let data = encode_page(&image, settings.format, quality).map_err(|e| {
            Pdf2ImgError::RenderFailed {
                page: page_num,
                detail: format!("image encoding failed: {}", e),
            }
        })?;
        drop(image);

        run.artifacts.push(PageArtifact {
            page_num,
            format: settings.format,
            data,
            width: viewport.width,
            height: viewport.height,
        });

        let percent = percent_complete(i + 1, selected);
        debug!("Page {} done ({}%)", page_num, percent);
        if let Some(artifact) = run.artifacts.last() {
            progress.on_page_complete(artifact, percent);
        }
    }

    if !token.is_current() {
        info!("Run {} superseded before commit", token.id());
        return Ok(ConversionOutcome::Superseded);
    }

    progress.on_conversion_complete(selected);

    let total_bytes = run.artifacts.iter().map(|a| a.byte_len() as u64).sum();
    let stats = ConversionStats {
        total_pages,
        selected_pages: selected,
        extraction_failures: run.extraction_failures,
        total_bytes,
        total_duration_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        "Converted {} pages ({} bytes) in {}ms",
        selected, stats.total_bytes, stats.total_duration_ms
    );

    Ok(ConversionOutcome::Completed(ConversionOutput {
        extracted_text: run.text.trim().to_string(),
        artifacts: run.artifacts,
        stats,
    }))
}
