//! Pipeline stages for PDF-to-image conversion.
//!
//! Each submodule implements exactly one step. The rendering backend sits
//! behind a trait so the loop in [`render`] can be driven by fakes in tests.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ backend ──▶ render ──▶ encode
//! (URL/path)  (pdfium)   (loop)     (PNG/JPEG)
//! ```
//!
//! 1. [`input`]   — read the user-supplied path or URL into shared bytes
//! 2. [`backend`] — open the document and its pages, rasterise, extract text
//! 3. [`render`]  — resolve the page range and walk it sequentially,
//!    reporting progress after each page
//! 4. [`encode`]  — turn each raster into PNG or JPEG bytes

pub mod backend;
pub mod encode;
pub mod input;
pub mod render;
