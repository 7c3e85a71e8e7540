use serde::Deserialize;
use std::{fs, path::Path};

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub label_scoring: ScoringWeights,
}

fn default_db_path() -> String {
    "filament.db".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Tesseract language code.
    #[serde(default = "default_lang")]
    pub lang: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            lang: default_lang(),
        }
    }
}

fn default_lang() -> String {
    "eng".to_string()
}

/// Tunable weights for the label-strategy composite score.
///
/// The composite is
/// `confidence_weight * ocr_confidence
///  + vocab_hit_weight * hits (at most vocab_hit_cap counted)
///  + diameter_bonus if a diameter pattern was found`,
/// clamped to 0..=100. Defaults were picked so a clean label with two or
/// three vocabulary hits scores above a noisy high-confidence read.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_confidence_weight")]
    pub confidence_weight: f64,
    #[serde(default = "default_vocab_hit_weight")]
    pub vocab_hit_weight: f64,
    #[serde(default = "default_vocab_hit_cap")]
    pub vocab_hit_cap: u32,
    #[serde(default = "default_diameter_bonus")]
    pub diameter_bonus: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            confidence_weight: default_confidence_weight(),
            vocab_hit_weight: default_vocab_hit_weight(),
            vocab_hit_cap: default_vocab_hit_cap(),
            diameter_bonus: default_diameter_bonus(),
        }
    }
}

fn default_confidence_weight() -> f64 {
    0.5
}

fn default_vocab_hit_weight() -> f64 {
    8.0
}

fn default_vocab_hit_cap() -> u32 {
    5
}

fn default_diameter_bonus() -> f64 {
    10.0
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.db_path, "filament.db");
        assert_eq!(cfg.ocr.lang, "eng");
        assert_eq!(cfg.label_scoring.vocab_hit_cap, 5);
    }

    #[test]
    fn partial_override() {
        let cfg: Config = toml::from_str(
            r#"
            db_path = "/tmp/test.db"

            [server]
            port = 9000

            [label_scoring]
            diameter_bonus = 20.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.db_path, "/tmp/test.db");
        assert_eq!(cfg.label_scoring.diameter_bonus, 20.0);
        assert_eq!(cfg.label_scoring.confidence_weight, 0.5);
    }
}
