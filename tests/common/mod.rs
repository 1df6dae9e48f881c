//! In-memory rendering backend for integration tests.
//!
//! Every page is 100 × 50 pt and renders to a deterministic gradient, so
//! tests can check dimensions and encoder behaviour without PDFium.

#![allow(dead_code)]

use edgequake_pdf2img::{
    BackendError, DocumentHandle, PageHandle, Pdf2ImgError, RenderBackend, SourceDocument,
    Viewport,
};
use image::{DynamicImage, Rgba, RgbaImage};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use tokio::sync::oneshot;

pub const PAGE_WIDTH_PT: f32 = 100.0;
pub const PAGE_HEIGHT_PT: f32 = 50.0;

pub type RenderHook = Arc<dyn Fn(usize) + Send + Sync>;

/// Blocks the first render that reaches it until released.
pub type Gate = Arc<Mutex<Option<(oneshot::Sender<()>, mpsc::Receiver<()>)>>>;

#[derive(Clone, Default)]
pub struct FakeBackend {
    pub pages: usize,
    pub fail_render: Option<usize>,
    pub fail_open_page: Option<usize>,
    pub fail_text: HashSet<usize>,
    pub corrupt: bool,
    pub password: Option<String>,
    pub text_requests: Arc<Mutex<Vec<usize>>>,
    pub documents_opened: Arc<AtomicUsize>,
    pub on_render: Option<RenderHook>,
    pub gate: Option<Gate>,
}

impl FakeBackend {
    pub fn with_pages(pages: usize) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    pub fn failing_render(mut self, page: usize) -> Self {
        self.fail_render = Some(page);
        self
    }

    pub fn failing_text(mut self, page: usize) -> Self {
        self.fail_text.insert(page);
        self
    }

    /// A factory closure suitable for `convert_with_backend`.
    pub fn factory(
        &self,
    ) -> impl Fn() -> Result<FakeBackend, Pdf2ImgError> + Send + Sync + 'static {
        let template = self.clone();
        move || Ok(template.clone())
    }

    pub fn text_requests(&self) -> Vec<usize> {
        self.text_requests.lock().unwrap().clone()
    }

    pub fn documents_opened(&self) -> usize {
        self.documents_opened.load(Ordering::SeqCst)
    }
}

impl RenderBackend for FakeBackend {
    fn open_document<'a>(
        &'a self,
        bytes: &'a [u8],
        password: Option<&'a str>,
    ) -> Result<Box<dyn DocumentHandle + 'a>, BackendError> {
        assert!(bytes.starts_with(b"%PDF"));
        self.documents_opened.fetch_add(1, Ordering::SeqCst);
        if self.corrupt {
            return Err(BackendError::Decode("trailer not found".into()));
        }
        match (self.password.as_deref(), password) {
            (Some(_), None) => return Err(BackendError::PasswordRequired),
            (Some(expected), Some(given)) if expected != given => {
                return Err(BackendError::WrongPassword)
            }
            _ => {}
        }
        Ok(Box::new(FakeDocument { backend: self }))
    }
}

struct FakeDocument<'a> {
    backend: &'a FakeBackend,
}

impl DocumentHandle for FakeDocument<'_> {
    fn page_count(&self) -> usize {
        self.backend.pages
    }

    fn open_page(&self, page_num: usize) -> Result<Box<dyn PageHandle + '_>, BackendError> {
        if self.backend.fail_open_page == Some(page_num) {
            return Err(BackendError::Page {
                page: page_num,
                detail: "missing page object".into(),
            });
        }
        Ok(Box::new(FakePage {
            backend: self.backend,
            page_num,
        }))
    }
}

struct FakePage<'a> {
    backend: &'a FakeBackend,
    page_num: usize,
}

impl PageHandle for FakePage<'_> {
    fn viewport(&self, scale: f32) -> Viewport {
        Viewport::from_points(PAGE_WIDTH_PT, PAGE_HEIGHT_PT, scale)
    }

    fn render(&self, viewport: &Viewport) -> Result<DynamicImage, BackendError> {
        if let Some(gate) = &self.backend.gate {
            let waiting = gate.lock().unwrap().take();
            if let Some((entered, release)) = waiting {
                let _ = entered.send(());
                let _ = release.recv();
            }
        }
        if let Some(hook) = &self.backend.on_render {
            hook(self.page_num);
        }
        if self.backend.fail_render == Some(self.page_num) {
            return Err(BackendError::Render {
                page: self.page_num,
                detail: "canvas allocation failed".into(),
            });
        }
        let seed = self.page_num as u32;
        Ok(DynamicImage::ImageRgba8(RgbaImage::from_fn(
            viewport.width,
            viewport.height,
            |x, y| {
                Rgba([
                    ((x * 7 + seed * 31) % 256) as u8,
                    ((y * 13 + x * 3) % 256) as u8,
                    ((x ^ y ^ seed) % 256) as u8,
                    255,
                ])
            },
        )))
    }

    fn extract_text(&self) -> Result<String, BackendError> {
        self.backend
            .text_requests
            .lock()
            .unwrap()
            .push(self.page_num);
        if self.backend.fail_text.contains(&self.page_num) {
            return Err(BackendError::Extract {
                page: self.page_num,
                detail: "no text layer".into(),
            });
        }
        Ok(format!("p{}", self.page_num))
    }
}

/// Route library logs to the test harness; `RUST_LOG=debug` shows them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn source() -> SourceDocument {
    SourceDocument::from_bytes("fixture.pdf", b"%PDF-1.7\n%%EOF\n".to_vec()).unwrap()
}

/// A gate plus the handles a test uses to observe and release it.
pub fn gate() -> (Gate, oneshot::Receiver<()>, mpsc::Sender<()>) {
    let (entered_tx, entered_rx) = oneshot::channel();
    let (release_tx, release_rx) = mpsc::channel();
    (
        Arc::new(Mutex::new(Some((entered_tx, release_rx)))),
        entered_rx,
        release_tx,
    )
}
