//! Text Recognition Adapter: a thin trait over an OCR engine.
//!
//! The pipeline only needs `png bytes -> (text, confidence)`; everything
//! interesting (preprocessing, scoring) wraps around this boundary. The
//! Tesseract implementation is gated behind the `tesseract` feature; the
//! mock backend is always available so the label pipeline can be exercised
//! without the system libraries.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
}

/// One recognition pass over an image.
#[derive(Debug, Clone)]
pub struct Recognition {
    pub text: String,
    /// Engine-reported confidence, 0..=100.
    pub confidence: f64,
}

/// Abstraction over an OCR backend. Implementations accept PNG-encoded
/// image bytes and return the recognized text with a confidence estimate.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, png_bytes: &[u8]) -> Result<Recognition, OcrError>;
}

/// Returns preset text and confidence regardless of input. Lets the
/// strategy-selection and field-extraction logic be tested without
/// Tesseract installed.
pub struct MockBackend {
    pub text: String,
    pub confidence: f64,
}

impl MockBackend {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

impl OcrBackend for MockBackend {
    fn recognize(&self, _png_bytes: &[u8]) -> Result<Recognition, OcrError> {
        Ok(Recognition {
            text: self.text.clone(),
            confidence: self.confidence,
        })
    }
}

/// Stand-in used when the binary is built without the `tesseract` feature.
/// Label requests fail with an engine error naming the missing feature
/// instead of the server refusing to start.
pub struct DisabledBackend;

impl OcrBackend for DisabledBackend {
    fn recognize(&self, _png_bytes: &[u8]) -> Result<Recognition, OcrError> {
        Err(OcrError::Engine(
            "OCR engine unavailable: rebuild with the `tesseract` feature".to_string(),
        ))
    }
}

#[cfg(feature = "tesseract")]
pub use tesseract_backend::TesseractBackend;

#[cfg(feature = "tesseract")]
mod tesseract_backend {
    use super::{OcrBackend, OcrError, Recognition};
    use leptess::LepTess;

    /// Tesseract via `leptess`. A fresh engine instance is created per call:
    /// `LepTess` is not `Sync`, and per-call construction keeps the backend
    /// safely shareable across concurrent requests.
    pub struct TesseractBackend {
        data_path: Option<String>,
        lang: String,
    }

    impl TesseractBackend {
        pub fn new(data_path: Option<String>, lang: &str) -> Self {
            Self {
                data_path,
                lang: lang.to_string(),
            }
        }
    }

    impl OcrBackend for TesseractBackend {
        fn recognize(&self, png_bytes: &[u8]) -> Result<Recognition, OcrError> {
            let mut engine = LepTess::new(self.data_path.as_deref(), &self.lang)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            engine
                .set_image_from_mem(png_bytes)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            // Tesseract works best around 300 DPI; labels are photographed
            // at unknown resolution, so declare it explicitly.
            engine.set_source_resolution(300);
            let text = engine
                .get_utf8_text()
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            let confidence = f64::from(engine.mean_text_conf()).clamp(0.0, 100.0);
            Ok(Recognition { text, confidence })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_preset_recognition() {
        let backend = MockBackend::new("PLA 1.75mm", 88.0);
        let r = backend.recognize(b"not a real image").unwrap();
        assert_eq!(r.text, "PLA 1.75mm");
        assert_eq!(r.confidence, 88.0);
    }
}
