//! Streaming conversion API: emit events as pages complete.
//!
//! Unlike the eager [`crate::convert::convert`], which returns only after
//! every page finishes, [`convert_stream`] yields a [`ConversionEvent`] per
//! page so callers can show live previews. Pages still render one at a time
//! and arrive in ascending page order.
//!
//! The stream always ends with exactly one terminal event: `Finished`,
//! `Failed` or `Superseded`. Artifacts seen in earlier `Page` events are
//! previews only; after `Failed` the run produced no output.

use crate::config::ConversionSettings;
use crate::convert::convert_with_backend;
use crate::error::Pdf2ImgError;
use crate::output::{ConversionOutcome, ConversionOutput, PageArtifact};
use crate::pipeline::backend::{PdfiumBackend, RenderBackend};
use crate::pipeline::input::SourceDocument;
use crate::progress::{ConversionProgressCallback, ProgressCallback};
use crate::run::RunToken;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, info};

/// One step of a streamed conversion.
#[derive(Debug)]
pub enum ConversionEvent {
    /// The page range was resolved; `total_pages` pages will follow.
    Started { total_pages: usize },
    /// A page finished rendering.
    Page { artifact: PageArtifact, percent: u8 },
    /// Every page succeeded.
    Finished(ConversionOutput),
    /// The run failed; no output was produced.
    Failed(Pdf2ImgError),
    /// A newer run superseded this one.
    Superseded,
}

impl ConversionEvent {
    /// `true` for the event that ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConversionEvent::Finished(_) | ConversionEvent::Failed(_) | ConversionEvent::Superseded
        )
    }
}

/// A boxed stream of conversion events.
pub type ConversionEventStream = Pin<Box<dyn Stream<Item = ConversionEvent> + Send>>;

/// Forwards pipeline callbacks into the event channel.
struct ChannelCallback {
    tx: mpsc::UnboundedSender<ConversionEvent>,
}

impl ChannelCallback {
    fn send(&self, event: ConversionEvent) {
        // The consumer may drop the stream early; the run still completes.
        if self.tx.send(event).is_err() {
            debug!("Conversion event dropped: stream closed");
        }
    }
}

impl ConversionProgressCallback for ChannelCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.send(ConversionEvent::Started { total_pages });
    }

    fn on_page_complete(&self, artifact: &PageArtifact, percent: u8) {
        self.send(ConversionEvent::Page {
            artifact: artifact.clone(),
            percent,
        });
    }
}

/// Convert with PDFium, streaming events as pages complete.
///
/// Must be called from within a Tokio runtime.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2img::{convert_stream, resolve_input, ConversionEvent, ConversionSettings};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let source = resolve_input("slides.pdf", 60).await?;
/// let mut events = convert_stream(&source, &ConversionSettings::default());
/// while let Some(event) = events.next().await {
///     match event {
///         ConversionEvent::Page { artifact, percent } => {
///             println!("page {} ({percent}%)", artifact.page_num)
///         }
///         ConversionEvent::Failed(e) => eprintln!("Error: {e}"),
///         _ => {}
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub fn convert_stream(
    source: &SourceDocument,
    settings: &ConversionSettings,
) -> ConversionEventStream {
    convert_stream_with_backend(PdfiumBackend::bind, source, settings, RunToken::detached())
}

/// [`convert_stream`] with a caller-supplied backend and run token.
pub fn convert_stream_with_backend<B, F>(
    make_backend: F,
    source: &SourceDocument,
    settings: &ConversionSettings,
    token: RunToken,
) -> ConversionEventStream
where
    B: RenderBackend + 'static,
    F: FnOnce() -> Result<B, Pdf2ImgError> + Send + 'static,
{
    info!("Starting streaming conversion: {}", source.name());
    let (tx, rx) = mpsc::unbounded_channel();
    let callback: ProgressCallback = Arc::new(ChannelCallback { tx: tx.clone() });
    let source = source.clone();
    let settings = settings.clone();

    tokio::spawn(async move {
        let result =
            convert_with_backend(make_backend, &source, &settings, Some(callback), token).await;
        let terminal = match result {
            Ok(ConversionOutcome::Completed(output)) => ConversionEvent::Finished(output),
            Ok(ConversionOutcome::Superseded) => ConversionEvent::Superseded,
            Err(e) => ConversionEvent::Failed(e),
        };
        if tx.send(terminal).is_err() {
            debug!("Terminal conversion event dropped: stream closed");
        }
    });

    Box::pin(UnboundedReceiverStream::new(rx))
}
