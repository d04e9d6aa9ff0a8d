//! PDF page text extraction.

use crate::error::{AmplonError, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, instrument};
use url::Url;

/// Extracts text from a PDF, one string per page in page order.
#[async_trait]
pub trait PdfExtractor: Send + Sync {
    async fn extract_pages(&self, bytes: Vec<u8>) -> Result<Vec<String>>;
}

/// Extractor backed by the `pdf-extract` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractText;

#[async_trait]
impl PdfExtractor for PdfExtractText {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn extract_pages(&self, bytes: Vec<u8>) -> Result<Vec<String>> {
        // Parsing is CPU-bound and may panic on malformed input
        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })
        .await
        .map_err(|e| AmplonError::Pdf(format!("PDF parser aborted: {}", e)))?
        .map_err(|e| AmplonError::Pdf(format!("{:?}", e)))?;

        debug!("Extracted {} pages", pages.len());
        Ok(pages)
    }
}

/// Check for the `%PDF-` header.
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}

/// Reduce a client-supplied name to a bare file name.
pub fn sanitize_filename(name: &str) -> Result<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();

    if base.is_empty() || base == "." || base == ".." {
        return Err(AmplonError::InvalidInput(format!("Invalid file name: {:?}", name)));
    }

    Ok(base.to_string())
}

/// Derive a file name for a PDF fetched from `url`.
pub fn filename_from_url(url: &Url) -> Result<String> {
    let last = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();

    let decoded = percent_decode(last);
    let name = sanitize_filename(&decoded)?;

    if name.to_lowercase().ends_with(".pdf") {
        Ok(name)
    } else {
        Ok(format!("{}.pdf", name))
    }
}

/// Derive a file name for a PDF on disk.
pub fn filename_from_path(path: &Path) -> Result<String> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    sanitize_filename(&name)
}

/// Decode `%XX` escapes in a path segment.
fn percent_decode(segment: &str) -> String {
    // form_urlencoded treats '+' as space and splits on '&', so escape both first
    let escaped = segment.replace('+', "%2B").replace('&', "%26");
    url::form_urlencoded::parse(format!("x={}", escaped).as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_else(|| segment.to_string())
}

/// Page texts as `(page number, text)`, 1-based, blank pages dropped.
pub fn number_pages(pages: Vec<String>) -> Vec<(i64, String)> {
    pages
        .into_iter()
        .enumerate()
        .filter_map(|(i, text)| {
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            (!text.is_empty()).then(|| (i as i64 + 1, text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf(b"%PDF-1.7\n..."));
        assert!(!is_pdf(b"<html>"));
        assert!(!is_pdf(b""));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("guide.pdf").unwrap(), "guide.pdf");
        assert_eq!(sanitize_filename("../../etc/guide.pdf").unwrap(), "guide.pdf");
        assert_eq!(sanitize_filename("C:\\docs\\guide.pdf").unwrap(), "guide.pdf");
        assert!(sanitize_filename("").is_err());
        assert!(sanitize_filename("dir/").is_err());
        assert!(sanitize_filename("..").is_err());
    }

    #[test]
    fn test_filename_from_url() {
        let url = Url::parse("https://example.com/files/Water%20Guide.pdf?dl=1").unwrap();
        assert_eq!(filename_from_url(&url).unwrap(), "Water Guide.pdf");

        let url = Url::parse("https://example.com/download/report").unwrap();
        assert_eq!(filename_from_url(&url).unwrap(), "report.pdf");

        let url = Url::parse("https://example.com/").unwrap();
        assert!(filename_from_url(&url).is_err());
    }

    #[test]
    fn test_number_pages_skips_blank() {
        let pages = vec![
            "Intro\n\ntext".to_string(),
            "   \n".to_string(),
            "Third page".to_string(),
        ];
        assert_eq!(
            number_pages(pages),
            vec![(1, "Intro text".to_string()), (3, "Third page".to_string())]
        );
    }
}
