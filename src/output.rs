//! Result types returned by a conversion.

use crate::config::ImageFormat;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// One rendered and encoded page.
///
/// Created once per successfully rendered page and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageArtifact {
    /// 1-indexed page number in the source document.
    pub page_num: usize,
    /// Encoding of `data`.
    pub format: ImageFormat,
    /// Encoded image bytes (PNG or JPEG).
    #[serde(skip_serializing)]
    #[serde(default)]
    pub data: Vec<u8>,
    /// Pixel width of the render viewport.
    pub width: u32,
    /// Pixel height of the render viewport.
    pub height: u32,
}

impl PageArtifact {
    /// `data:image/png;base64,…` URI suitable for `<img src>`.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            STANDARD.encode(&self.data)
        )
    }

    /// Download file name: `{stem}-page-{n}.{ext}`.
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}-page-{}.{}", stem, self.page_num, self.format.extension())
    }

    /// Size of the encoded payload in bytes.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

/// The complete output of a successful conversion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// One artifact per selected page, in ascending page order.
    pub artifacts: Vec<PageArtifact>,
    /// Text extracted from the first three selected pages, space separated
    /// and trimmed. May be empty.
    pub extracted_text: String,
    pub stats: ConversionStats,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages selected by the range expression.
    pub selected_pages: usize,
    /// Pages whose text extraction failed (absorbed, never fatal).
    pub extraction_failures: usize,
    /// Sum of encoded artifact sizes.
    pub total_bytes: u64,
    pub total_duration_ms: u64,
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone)]
pub enum ConversionOutcome {
    /// Every selected page was converted.
    Completed(ConversionOutput),
    /// A newer run started before this one finished. Nothing was committed.
    Superseded,
}

impl ConversionOutcome {
    /// The output, or `None` if the run was superseded.
    pub fn completed(self) -> Option<ConversionOutput> {
        match self {
            ConversionOutcome::Completed(out) => Some(out),
            ConversionOutcome::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, ConversionOutcome::Superseded)
    }
}

/// Document information available without rendering any page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}
