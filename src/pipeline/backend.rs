//! The rendering backend seam: open a document, open a page, render it.
//!
//! The pipeline only talks to these traits. [`PdfiumBackend`] is the
//! production implementation; tests drive the pipeline with in-memory fakes
//! that can fail on chosen pages.
//!
//! Handles borrow from their parent (`page` from `document` from `backend`),
//! so dropping the document at the end of a run releases every decoding
//! resource on every exit path.
//!
//! None of the traits require `Send`: a backend is created and used on the
//! single blocking thread that runs a conversion.

use crate::error::{BackendError, Pdf2ImgError};
use crate::output::DocumentMetadata;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::debug;

/// Pixel dimensions of a page rendered at a given scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scale: f32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Viewport for a page measured in PDF points (1/72 inch).
    ///
    /// Fractional pixels are truncated; a dimension never drops below 1 px.
    pub fn from_points(width_pt: f32, height_pt: f32, scale: f32) -> Self {
        let px = |pt: f32| ((pt * scale).floor() as u32).max(1);
        Self {
            scale,
            width: px(width_pt),
            height: px(height_pt),
        }
    }
}

/// Opens documents from raw bytes.
pub trait RenderBackend {
    /// Decode `bytes` as a document. Called once per conversion run.
    fn open_document<'a>(
        &'a self,
        bytes: &'a [u8],
        password: Option<&'a str>,
    ) -> Result<Box<dyn DocumentHandle + 'a>, BackendError>;
}

impl<T: RenderBackend + ?Sized> RenderBackend for Box<T> {
    fn open_document<'a>(
        &'a self,
        bytes: &'a [u8],
        password: Option<&'a str>,
    ) -> Result<Box<dyn DocumentHandle + 'a>, BackendError> {
        (**self).open_document(bytes, password)
    }
}

/// An open document.
pub trait DocumentHandle {
    fn page_count(&self) -> usize;

    /// Open the 1-indexed page `page_num`.
    fn open_page(&self, page_num: usize) -> Result<Box<dyn PageHandle + '_>, BackendError>;

    fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata {
            page_count: self.page_count(),
            ..Default::default()
        }
    }
}

/// An open page.
pub trait PageHandle {
    fn viewport(&self, scale: f32) -> Viewport;

    fn render(&self, viewport: &Viewport) -> Result<DynamicImage, BackendError>;

    fn extract_text(&self) -> Result<String, BackendError>;
}

// ── PDFium ───────────────────────────────────────────────────────────────

/// [`RenderBackend`] over the PDFium C++ library via `pdfium-render`.
pub struct PdfiumBackend {
    pdfium: Pdfium,
}

impl PdfiumBackend {
    /// Bind to the process-wide PDFium library (see `pdfium_fetch::init_library`).
    pub fn bind() -> Result<Self, Pdf2ImgError> {
        pdfium_fetch::bind()
            .map(Self::new)
            .map_err(|e| Pdf2ImgError::PdfiumBindingFailed(e.to_string()))
    }

    pub fn new(pdfium: Pdfium) -> Self {
        Self { pdfium }
    }
}

impl RenderBackend for PdfiumBackend {
    fn open_document<'a>(
        &'a self,
        bytes: &'a [u8],
        password: Option<&'a str>,
    ) -> Result<Box<dyn DocumentHandle + 'a>, BackendError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, password)
            .map_err(|e| {
                let detail = format!("{:?}", e);
                if detail.contains("Password") || detail.contains("password") {
                    if password.is_some() {
                        BackendError::WrongPassword
                    } else {
                        BackendError::PasswordRequired
                    }
                } else {
                    BackendError::Decode(detail)
                }
            })?;
        Ok(Box::new(PdfiumDocument { document }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl DocumentHandle for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn open_page(&self, page_num: usize) -> Result<Box<dyn PageHandle + '_>, BackendError> {
        let page_err = |detail: String| BackendError::Page {
            page: page_num,
            detail,
        };
        let index = page_num
            .checked_sub(1)
            .and_then(|i| u16::try_from(i).ok())
            .ok_or_else(|| page_err("page number out of range".to_string()))?;
        let page = self
            .document
            .pages()
            .get(index)
            .map_err(|e| page_err(format!("{:?}", e)))?;
        Ok(Box::new(PdfiumPage { page, page_num }))
    }

    fn metadata(&self) -> DocumentMetadata {
        let metadata = self.document.metadata();
        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata
                .get(tag)
                .map(|t| t.value().to_string())
                .filter(|v| !v.is_empty())
        };

        DocumentMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            page_count: self.page_count(),
            pdf_version: format!("{:?}", self.document.version()),
        }
    }
}

struct PdfiumPage<'a> {
    page: PdfPage<'a>,
    page_num: usize,
}

impl PageHandle for PdfiumPage<'_> {
    fn viewport(&self, scale: f32) -> Viewport {
        Viewport::from_points(self.page.width().value, self.page.height().value, scale)
    }

    fn render(&self, viewport: &Viewport) -> Result<DynamicImage, BackendError> {
        let render_config = PdfRenderConfig::new()
            .set_target_width(viewport.width as i32)
            .set_target_height(viewport.height as i32);

        let bitmap = self
            .page
            .render_with_config(&render_config)
            .map_err(|e| BackendError::Render {
                page: self.page_num,
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            self.page_num,
            image.width(),
            image.height()
        );
        Ok(image)
    }

    fn extract_text(&self) -> Result<String, BackendError> {
        self.page
            .text()
            .map(|text| text.all())
            .map_err(|e| BackendError::Extract {
                page: self.page_num,
                detail: format!("{:?}", e),
            })
    }
}
