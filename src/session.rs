//! A long-lived conversion session over one loaded document.
//!
//! [`ConversionSession`] holds what an interactive front end keeps between
//! runs: the loaded document, its page count, the artifacts of the last
//! successful run and the pending summary. Every [`convert`] begins a new run
//! generation, so a run that is still in flight when another starts is
//! superseded: it stops at the next page boundary and its result is never
//! committed.
//!
//! A failed run (empty page selection, decode or render failure) leaves the
//! previous artifacts in place and returns the session to
//! [`SessionState::AwaitingInput`].
//!
//! [`convert`]: ConversionSession::convert

use crate::config::ConversionSettings;
use crate::convert::{convert_with_backend, inspect_with_backend};
use crate::error::Pdf2ImgError;
use crate::output::{ConversionOutcome, DocumentMetadata, PageArtifact};
use crate::pipeline::backend::{PdfiumBackend, RenderBackend};
use crate::pipeline::input::SourceDocument;
use crate::progress::ProgressCallback;
use crate::run::RunTracker;
use crate::summarize::{dispatch_summary, DocumentAnalysis, Summarizer};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Creates a fresh backend for each run.
pub type BackendFactory =
    Arc<dyn Fn() -> Result<Box<dyn RenderBackend>, Pdf2ImgError> + Send + Sync>;

/// Where the session is in its load → convert cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No document loaded.
    Empty,
    /// A document is loaded and waiting for settings.
    AwaitingInput,
    /// A run is in flight.
    Converting,
    /// The last run completed; artifacts are available.
    Converted,
}

struct SessionInner {
    state: SessionState,
    source: Option<SourceDocument>,
    metadata: Option<DocumentMetadata>,
    artifacts: Vec<PageArtifact>,
    extracted_text: String,
    analysis: Option<oneshot::Receiver<DocumentAnalysis>>,
}

impl SessionInner {
    fn empty() -> Self {
        Self {
            state: SessionState::Empty,
            source: None,
            metadata: None,
            artifacts: Vec::new(),
            extracted_text: String::new(),
            analysis: None,
        }
    }
}

/// See the [module docs](self).
pub struct ConversionSession {
    factory: BackendFactory,
    runs: RunTracker,
    summarizer: Option<Arc<dyn Summarizer>>,
    inner: Mutex<SessionInner>,
}

impl Default for ConversionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversionSession {
    /// A session rendering with PDFium.
    pub fn new() -> Self {
        Self::with_backend(PdfiumBackend::bind)
    }

    /// A session rendering with backends produced by `make_backend`.
    pub fn with_backend<B, F>(make_backend: F) -> Self
    where
        B: RenderBackend + 'static,
        F: Fn() -> Result<B, Pdf2ImgError> + Send + Sync + 'static,
    {
        let factory: BackendFactory =
            Arc::new(move || make_backend().map(|b| Box::new(b) as Box<dyn RenderBackend>));
        Self {
            factory,
            runs: RunTracker::new(),
            summarizer: None,
            inner: Mutex::new(SessionInner::empty()),
        }
    }

    /// Summarise the extracted text after each successful run.
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load a document, replacing any previous one. Returns its page count.
    ///
    /// Supersedes any run still in flight and clears previous artifacts.
    pub async fn load(&self, source: SourceDocument) -> Result<usize, Pdf2ImgError> {
        self.runs.invalidate();
        let factory = Arc::clone(&self.factory);
        let result = inspect_with_backend(move || factory(), &source).await;

        let mut inner = self.lock();
        // A convert() that began while the document was opening still holds
        // the old source.
        self.runs.invalidate();
        *inner = SessionInner::empty();
        let metadata = result?;
        let page_count = metadata.page_count;
        info!("Loaded '{}': {} pages", source.name(), page_count);
        inner.source = Some(source);
        inner.metadata = Some(metadata);
        inner.state = SessionState::AwaitingInput;
        Ok(page_count)
    }

    /// Convert the loaded document.
    ///
    /// Returns [`ConversionOutcome::Superseded`] if another `convert`, `load`
    /// or `reset` happened before this run finished; the session then
    /// reflects that newer call only.
    pub async fn convert(
        &self,
        settings: &ConversionSettings,
        progress: Option<ProgressCallback>,
    ) -> Result<ConversionOutcome, Pdf2ImgError> {
        let (source, token) = {
            let mut inner = self.lock();
            let source = inner.source.clone().ok_or_else(|| {
                Pdf2ImgError::InvalidConfig("no document loaded; call load() first".to_string())
            })?;
            let token = self.runs.begin();
            inner.state = SessionState::Converting;
            (source, token)
        };
        debug!("Session run {} started", token.id());

        let factory = Arc::clone(&self.factory);
        let make_backend = move || factory();
        let result =
            convert_with_backend(make_backend, &source, settings, progress, token.clone()).await;

        let mut inner = self.lock();
        if !token.is_current() {
            debug!("Session run {} superseded; result discarded", token.id());
            return Ok(ConversionOutcome::Superseded);
        }

        match result {
            Ok(ConversionOutcome::Completed(output)) => {
                inner.artifacts = output.artifacts.clone();
                inner.extracted_text = output.extracted_text.clone();
                inner.state = SessionState::Converted;
                inner.analysis = self
                    .summarizer
                    .as_ref()
                    .and_then(|s| dispatch_summary(Arc::clone(s), &output.extracted_text));
                Ok(ConversionOutcome::Completed(output))
            }
            Ok(ConversionOutcome::Superseded) => Ok(ConversionOutcome::Superseded),
            Err(e) => {
                inner.state = SessionState::AwaitingInput;
                Err(e)
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Page count of the loaded document (0 if none).
    pub fn page_count(&self) -> usize {
        self.lock().metadata.as_ref().map_or(0, |m| m.page_count)
    }

    pub fn metadata(&self) -> Option<DocumentMetadata> {
        self.lock().metadata.clone()
    }

    /// Artifacts of the last successful run.
    pub fn artifacts(&self) -> Vec<PageArtifact> {
        self.lock().artifacts.clone()
    }

    pub fn extracted_text(&self) -> String {
        self.lock().extracted_text.clone()
    }

    /// Take the pending summary receiver, if a summary was dispatched.
    pub fn take_analysis(&self) -> Option<oneshot::Receiver<DocumentAnalysis>> {
        self.lock().analysis.take()
    }

    /// Drop the document and everything derived from it.
    pub fn reset(&self) {
        self.runs.invalidate();
        *self.lock() = SessionInner::empty();
    }
}
