//! Input resolution: turn a user-supplied path or URL into document bytes.
//!
//! Every conversion run re-decodes the document from these bytes, so the
//! bytes are read once and shared (`Arc<[u8]>`) instead of re-read from disk.
//! We check the PDF magic bytes (`%PDF`) up front so callers get a meaningful
//! error rather than a pdfium decode failure.

use crate::error::Pdf2ImgError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// A document held in memory, ready to be (re-)opened by a conversion run.
#[derive(Clone)]
pub struct SourceDocument {
    name: String,
    bytes: Arc<[u8]>,
    password: Option<String>,
}

impl SourceDocument {
    /// Wrap in-memory bytes. `name` is used in messages and output file names.
    pub fn from_bytes(
        name: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<Self, Pdf2ImgError> {
        let name = name.into();
        let bytes = bytes.into();
        check_magic(&name, &bytes)?;
        Ok(Self {
            name,
            bytes,
            password: None,
        })
    }

    /// User password for encrypted documents.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// File name without directory and `.pdf` extension, for naming outputs.
    pub fn stem(&self) -> String {
        let file = self
            .name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.name);
        let stem = match file.len().checked_sub(4) {
            Some(cut) if file.is_char_boundary(cut) && file[cut..].eq_ignore_ascii_case(".pdf") => {
                &file[..cut]
            }
            _ => file,
        };
        if stem.is_empty() {
            "file".to_string()
        } else {
            stem.to_string()
        }
    }
}

impl fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDocument")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn check_magic(name: &str, bytes: &[u8]) -> Result<(), Pdf2ImgError> {
    if bytes.starts_with(b"%PDF") {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(Pdf2ImgError::NotAPdf {
        name: name.to_string(),
        magic,
    })
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to an in-memory document.
///
/// If the input is a URL, download it. Otherwise read the local file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<SourceDocument, Pdf2ImgError> {
    if input.trim().is_empty() {
        return Err(Pdf2ImgError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(Path::new(input)).await
    }
}

async fn read_local(path: &Path) -> Result<SourceDocument, Pdf2ImgError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Pdf2ImgError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => Pdf2ImgError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    SourceDocument::from_bytes(path.display().to_string(), bytes)
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<SourceDocument, Pdf2ImgError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| Pdf2ImgError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Pdf2ImgError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    info!("Downloaded {} bytes", bytes.len());

    SourceDocument::from_bytes(url_file_name(url), bytes.to_vec())
}

/// Last path segment of the URL if it looks like a file name.
fn url_file_name(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty() && last.contains('.'))
        .unwrap_or_else(|| "downloaded.pdf".to_string())
}

/// Default output directory for a source: alongside a local file, else `.`.
pub fn default_output_dir(input: &str) -> PathBuf {
    if is_url(input) {
        return PathBuf::from(".");
    }
    Path::new(input)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINI_PDF: &[u8] = b"%PDF-1.4\n%%EOF\n";

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn rejects_non_pdf_bytes() {
        let err = SourceDocument::from_bytes("notes.txt", b"hello".to_vec()).unwrap_err();
        match err {
            Pdf2ImgError::NotAPdf { magic, .. } => assert_eq!(&magic, b"hell"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(SourceDocument::from_bytes("empty", Vec::new()).is_err());
    }

    #[test]
    fn stem_strips_directory_and_extension() {
        let doc = SourceDocument::from_bytes("/tmp/in/Report.PDF", MINI_PDF.to_vec()).unwrap();
        assert_eq!(doc.stem(), "Report");
        let doc = SourceDocument::from_bytes("scan", MINI_PDF.to_vec()).unwrap();
        assert_eq!(doc.stem(), "scan");
        let doc = SourceDocument::from_bytes(".pdf", MINI_PDF.to_vec()).unwrap();
        assert_eq!(doc.stem(), "file");
    }

    #[test]
    fn debug_redacts_password() {
        let doc = SourceDocument::from_bytes("a.pdf", MINI_PDF.to_vec())
            .unwrap()
            .with_password("hunter2");
        let dbg = format!("{doc:?}");
        assert!(!dbg.contains("hunter2"));
        assert_eq!(doc.password(), Some("hunter2"));
    }

    #[test]
    fn url_file_name_falls_back() {
        assert_eq!(url_file_name("https://x.org/papers/a.pdf"), "a.pdf");
        assert_eq!(url_file_name("https://arxiv.org/pdf/1706"), "downloaded.pdf");
    }

    #[test]
    fn default_output_dir_follows_input() {
        assert_eq!(default_output_dir("docs/a.pdf"), PathBuf::from("docs"));
        assert_eq!(default_output_dir("a.pdf"), PathBuf::from("."));
        assert_eq!(default_output_dir("https://x.org/a.pdf"), PathBuf::from("."));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = resolve_input("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, Pdf2ImgError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn reads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mini.pdf");
        std::fs::write(&path, MINI_PDF).unwrap();
        let doc = resolve_input(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(doc.bytes(), MINI_PDF);
        assert_eq!(doc.stem(), "mini");
    }
}
