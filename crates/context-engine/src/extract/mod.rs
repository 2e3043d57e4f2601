//! Text extraction from uploaded documents.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to load PDF: {0}")]
    InvalidPdf(String),

    #[error("Document contains no extractable text")]
    NoText,
}

/// Turns raw upload bytes into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// Extracts embedded text from PDF documents, page by page.
#[derive(Debug, Clone, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let _span = tracing::info_span!("extract.pdf", bytes = bytes.len()).entered();

        let doc = lopdf::Document::load_mem(bytes)
            .map_err(|e| ExtractError::InvalidPdf(e.to_string()))?;

        let mut text = String::new();
        // get_pages is a BTreeMap keyed by page number, so this is page order.
        for (page_num, _) in doc.get_pages() {
            match doc.extract_text(&[page_num]) {
                Ok(page_text) => {
                    text.push_str(&page_text);
                    text.push('\n');
                }
                Err(e) => {
                    tracing::warn!(page = page_num, "Skipping unreadable PDF page: {}", e);
                }
            }
        }

        if text.trim().is_empty() {
            return Err(ExtractError::NoText);
        }

        Ok(text)
    }
}
