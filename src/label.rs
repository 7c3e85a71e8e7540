//! Label Recognizer: turns a photo of a spool label into a best-effort
//! structured guess of product attributes.
//!
//! Single-pass OCR on physical labels is unreliable (glare, curvature,
//! low contrast), so the image is run through an ordered list of
//! preprocessing strategies and the result with the best composite score
//! wins. Field extraction then works on the winning raw text only.

use crate::config::ScoringWeights;
use crate::error::ExtractionError;
use crate::ocr::OcrBackend;
use crate::vocab::{self, Vocabulary};
use image::{DynamicImage, GrayImage, ImageFormat, imageops::FilterType};
use imageproc::contrast::{ThresholdType, otsu_level, stretch_contrast, threshold};
use serde::Serialize;
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, warn};

/// Structured output of the label recognizer. Optional fields are either
/// confidently matched values or absent; `raw_text` is always populated so
/// callers can diagnose misses.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedLabel {
    pub brand: Option<String>,
    pub material: Option<String>,
    pub color_name: Option<String>,
    pub diameter_mm: Option<f64>,
    pub barcode: Option<String>,
    pub raw_text: String,
    pub confidence: f64,
    pub strategy_used: String,
}

/// One deterministic preprocessing variant.
struct Strategy {
    name: &'static str,
    apply: fn(&DynamicImage) -> GrayImage,
}

/// Ordered by a priori reliability; ties in composite score go to the
/// earliest entry.
fn strategies() -> &'static [Strategy] {
    &[
        Strategy {
            name: "grayscale",
            apply: |img| img.to_luma8(),
        },
        Strategy {
            name: "otsu-threshold",
            apply: |img| {
                let gray = img.to_luma8();
                let level = otsu_level(&gray);
                threshold(&gray, level, ThresholdType::Binary)
            },
        },
        Strategy {
            name: "contrast-stretch",
            apply: |img| contrast_stretch(&img.to_luma8()),
        },
        Strategy {
            name: "upscale-2x",
            apply: |img| {
                img.resize(
                    img.width().saturating_mul(2),
                    img.height().saturating_mul(2),
                    FilterType::Lanczos3,
                )
                .to_luma8()
            },
        },
        Strategy {
            name: "rotate-90",
            apply: |img| img.rotate90().to_luma8(),
        },
        Strategy {
            name: "rotate-270",
            apply: |img| img.rotate270().to_luma8(),
        },
    ]
}

/// Stretch the observed intensity range to the full 0..=255 span.
fn contrast_stretch(gray: &GrayImage) -> GrayImage {
    let mut lo = u8::MAX;
    let mut hi = u8::MIN;
    for p in gray.pixels() {
        lo = lo.min(p.0[0]);
        hi = hi.max(p.0[0]);
    }
    if lo >= hi {
        return gray.clone();
    }
    stretch_contrast(gray, lo, hi, 0, 255)
}

struct Candidate {
    strategy: &'static str,
    text: String,
    score: f64,
}

pub struct LabelRecognizer {
    backend: Arc<dyn OcrBackend>,
    vocab: Arc<Vocabulary>,
    weights: ScoringWeights,
}

impl LabelRecognizer {
    pub fn new(
        backend: Arc<dyn OcrBackend>,
        vocab: Arc<Vocabulary>,
        weights: ScoringWeights,
    ) -> Self {
        Self {
            backend,
            vocab,
            weights,
        }
    }

    /// Run the full pipeline on raw image bytes.
    pub fn parse(&self, image_bytes: &[u8]) -> Result<ParsedLabel, ExtractionError> {
        if image_bytes.is_empty() {
            return Err(ExtractionError::InvalidInput(
                "uploaded file is empty".to_string(),
            ));
        }

        let img = image::load_from_memory(image_bytes)
            .map_err(|e| ExtractionError::InvalidImage(format!("failed to decode image: {e}")))?;

        let mut best: Option<Candidate> = None;
        let mut engine_error: Option<String> = None;
        let mut any_recognized = false;
        for strategy in strategies() {
            let processed = (strategy.apply)(&img);
            let png = match encode_png(&processed) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(strategy = strategy.name, error = %e, "failed to encode processed image");
                    continue;
                }
            };
            let recognition = match self.backend.recognize(&png) {
                Ok(r) => r,
                Err(e) => {
                    warn!(strategy = strategy.name, error = %e, "OCR strategy failed");
                    engine_error = Some(e.to_string());
                    continue;
                }
            };
            any_recognized = true;
            if recognition.text.trim().is_empty() {
                debug!(strategy = strategy.name, "strategy produced no text");
                continue;
            }

            let score = self.composite_score(&recognition.text, recognition.confidence);
            debug!(
                strategy = strategy.name,
                ocr_confidence = recognition.confidence,
                score,
                "strategy scored"
            );
            // Strictly greater: on ties the earlier (more reliable) strategy
            // is kept, which makes selection deterministic.
            if best.as_ref().is_none_or(|b| score > b.score) {
                best = Some(Candidate {
                    strategy: strategy.name,
                    text: recognition.text,
                    score,
                });
            }
        }

        // An engine that failed on every pass is a server fault, not a bad
        // image. `InvalidImage` is reserved for images the engine read but
        // got no text out of.
        let best = match best {
            Some(b) => b,
            None if !any_recognized && engine_error.is_some() => {
                return Err(ExtractionError::Unexpected(format!(
                    "OCR engine failed on every strategy: {}",
                    engine_error.unwrap_or_default()
                )));
            }
            None => {
                return Err(ExtractionError::InvalidImage(
                    "no preprocessing strategy yielded readable text".to_string(),
                ));
            }
        };

        // Fields are extracted independently; anything unmatched stays absent.
        let label = ParsedLabel {
            brand: self.vocab.match_brand(&best.text),
            material: self.vocab.match_material(&best.text),
            color_name: self.vocab.match_color(&best.text),
            diameter_mm: vocab::extract_diameter(&best.text),
            barcode: vocab::extract_barcode(&best.text),
            raw_text: best.text,
            confidence: best.score,
            strategy_used: best.strategy.to_string(),
        };
        debug!(
            strategy = %label.strategy_used,
            confidence = label.confidence,
            brand = ?label.brand,
            material = ?label.material,
            color = ?label.color_name,
            diameter = ?label.diameter_mm,
            "label parsed"
        );
        Ok(label)
    }

    /// Composite of engine confidence, vocabulary hits, and the presence of
    /// a diameter pattern. Weights come from configuration.
    fn composite_score(&self, text: &str, ocr_confidence: f64) -> f64 {
        let hits = self.vocab.vocab_hits(text).min(self.weights.vocab_hit_cap);
        let mut score = self.weights.confidence_weight * ocr_confidence
            + self.weights.vocab_hit_weight * f64::from(hits);
        if vocab::extract_diameter(text).is_some() {
            score += self.weights.diameter_bonus;
        }
        score.clamp(0.0, 100.0)
    }
}

fn encode_png(gray: &GrayImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    gray.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}
