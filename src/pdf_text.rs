//! PDF text-layer extraction for invoice parsing.
//!
//! Two phases: a structural pass with `lopdf` to detect scanned
//! (image-only) documents cheaply, then full text extraction with
//! `pdf-extract`. Pages are concatenated in document order.

use crate::error::ExtractionError;
use lopdf::{Dictionary, Document};
use tracing::{debug, warn};

/// Minimum number of non-whitespace characters expected from a real text
/// PDF. Below this the document is treated as scanned.
const MIN_TEXT_CHARS: usize = 30;

/// Extract the text layer from raw PDF bytes, or fail with
/// `InvalidDocument` when there is nothing usable to parse.
pub fn extract_text(pdf_bytes: &[u8]) -> Result<String, ExtractionError> {
    if pdf_bytes.is_empty() {
        return Err(ExtractionError::InvalidInput(
            "uploaded file is empty".to_string(),
        ));
    }

    let doc = Document::load_mem(pdf_bytes)
        .map_err(|e| ExtractionError::InvalidDocument(format!("failed to parse PDF: {e}")))?;

    if looks_like_scanned(&doc) {
        return Err(ExtractionError::InvalidDocument(
            "document appears to be scanned; no extractable text layer".to_string(),
        ));
    }

    match pdf_extract::extract_text_from_mem(pdf_bytes) {
        Ok(text) => {
            let meaningful = text.chars().filter(|c| !c.is_whitespace()).count();
            if meaningful < MIN_TEXT_CHARS {
                debug!(chars = meaningful, "extracted text too short");
                Err(ExtractionError::InvalidDocument(
                    "document contains too little text to parse".to_string(),
                ))
            } else {
                debug!(chars = meaningful, "text layer extracted");
                Ok(text)
            }
        }
        Err(e) => {
            warn!(error = %e, "text extraction failed");
            Err(ExtractionError::InvalidDocument(format!(
                "could not extract text from PDF: {e}"
            )))
        }
    }
}

/// Inspect the object tree for pages that carry XObject images but no Font
/// resources. When most pages look like that, the PDF is a scan and text
/// extraction would be pointless.
fn looks_like_scanned(doc: &Document) -> bool {
    let pages = doc.get_pages();
    if pages.is_empty() {
        return false; // let text extraction make the call
    }

    let image_only = pages
        .values()
        .filter(|object_id| {
            let Ok(page) = doc.get_object(**object_id).and_then(|o| o.as_dict()) else {
                return false;
            };
            has_resource(doc, page, b"XObject") && !has_resource(doc, page, b"Font")
        })
        .count();

    let ratio = image_only as f64 / pages.len() as f64;
    debug!(
        total_pages = pages.len(),
        image_only,
        "scanned-page analysis"
    );
    ratio >= 0.8
}

/// Whether the page's (dereferenced) Resources dictionary has a non-empty
/// entry under `key`.
fn has_resource(doc: &Document, page: &Dictionary, key: &[u8]) -> bool {
    page.get(b"Resources")
        .ok()
        .and_then(|r| doc.dereference(r).ok())
        .and_then(|(_, resolved)| resolved.as_dict().ok())
        .and_then(|res| res.get(key).ok())
        .and_then(|v| doc.dereference(v).ok())
        .and_then(|(_, resolved)| resolved.as_dict().ok())
        .is_some_and(|dict| !dict.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bytes_is_invalid_input() {
        assert!(matches!(
            extract_text(&[]),
            Err(ExtractionError::InvalidInput(_))
        ));
    }

    #[test]
    fn garbage_bytes_is_invalid_document() {
        assert!(matches!(
            extract_text(b"this is not a pdf"),
            Err(ExtractionError::InvalidDocument(_))
        ));
    }
}
