//! Progress-callback trait for per-page conversion events.
//!
//! Pass an [`Arc<dyn ConversionProgressCallback>`] to
//! [`crate::convert::convert`] to receive events while the pipeline works
//! through the selected pages.
//!
//! # Cadence
//!
//! Pages are rendered strictly one after another, so events arrive in page
//! order from a single thread:
//!
//! 1. [`on_conversion_start`](ConversionProgressCallback::on_conversion_start) once,
//!    after the page range has been resolved;
//! 2. [`on_page_complete`](ConversionProgressCallback::on_page_complete) once per page,
//!    carrying the finished artifact and the overall percentage;
//! 3. [`on_conversion_complete`](ConversionProgressCallback::on_conversion_complete) once,
//!    only if every page succeeded.
//!
//! Percentages are `round(100 * done / total)`: non-decreasing, one value per
//! page, exactly 100 on the last page.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2img::{ConversionProgressCallback, PageArtifact};
//! use std::sync::atomic::{AtomicU8, Ordering};
//!
//! struct LastPercent(AtomicU8);
//!
//! impl ConversionProgressCallback for LastPercent {
//!     fn on_page_complete(&self, _artifact: &PageArtifact, percent: u8) {
//!         self.0.store(percent, Ordering::SeqCst);
//!     }
//! }
//! ```

use crate::output::PageArtifact;
use std::sync::Arc;

/// Called by the conversion pipeline as it processes each page.
///
/// Implementations must be `Send + Sync`: the pipeline runs on a blocking
/// worker thread, not the caller's. All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first page is rendered.
    ///
    /// # Arguments
    /// * `total_pages` — number of pages selected for this run
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after each page has been rendered and encoded.
    ///
    /// # Arguments
    /// * `artifact` — the finished page (usable as a live preview)
    /// * `percent`  — overall progress, 1–100
    fn on_page_complete(&self, artifact: &PageArtifact, percent: u8) {
        let _ = (artifact, percent);
    }

    /// Called once after every selected page succeeded.
    fn on_conversion_complete(&self, total_pages: usize) {
        let _ = total_pages;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias for a shared callback.
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

/// Adapts a plain `Fn(percent)` closure into a callback.
pub struct PercentCallback<F>(pub F);

impl<F> ConversionProgressCallback for PercentCallback<F>
where
    F: Fn(u8) + Send + Sync,
{
    fn on_page_complete(&self, _artifact: &PageArtifact, percent: u8) {
        (self.0)(percent)
    }
}

/// `round(100 * done / total)` with halves rounded up. `total == 0` is 100.
pub fn percent_complete(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let done = done.min(total) as u64;
    let total = total as u64;
    ((200 * done + total) / (2 * total)) as u8
}
