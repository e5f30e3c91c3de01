//! PDF text extraction, one string per page.

use std::panic;

use super::LoadError;

/// Extract the text of every page in document order.
///
/// `pdf-extract` separates pages with a form feed. Blank pages are kept so
/// that page numbers line up with the source file.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, LoadError> {
    // The extractor panics on some malformed inputs instead of erroring.
    let text = panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| LoadError::Pdf("extractor aborted on malformed input".to_string()))?
        .map_err(|e| LoadError::Pdf(e.to_string()))?;
    Ok(split_pages(&text))
}

fn split_pages(text: &str) -> Vec<String> {
    let mut pages: Vec<String> = text
        .split('\x0C')
        .map(|page| page.trim().to_string())
        .collect();
    // A trailing form feed closes the last page rather than opening a new one.
    if pages.len() > 1 && pages.last().is_some_and(|p| p.is_empty()) {
        pages.pop();
    }
    pages
}
