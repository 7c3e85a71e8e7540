//! Controlled vocabularies for filament products and the fuzzy matching
//! used by both the label recognizer and the invoice extractor.
//!
//! Each entry maps a canonical value to the surface forms it may appear as
//! in OCR output or invoice descriptions. Matching is case-insensitive and
//! tolerates small edit distances to absorb OCR noise.

use regex::Regex;

/// One canonical value plus its accepted surface-form variants.
#[derive(Debug, Clone)]
struct VocabEntry {
    canonical: &'static str,
    variants: &'static [&'static str],
}

/// Read-only lookup tables, built once and shared across requests.
#[derive(Debug)]
pub struct Vocabulary {
    brands: Vec<VocabEntry>,
    materials: Vec<VocabEntry>,
    colors: Vec<VocabEntry>,
    vendors: Vec<VocabEntry>,
    product_lines: Vec<VocabEntry>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            brands: vec![
                entry("Bambu Lab", &["bambu lab", "bambulab", "bambu"]),
                entry("Prusament", &["prusament", "prusa"]),
                entry("Polymaker", &["polymaker"]),
                entry("eSUN", &["esun"]),
                entry("Hatchbox", &["hatchbox"]),
                entry("Overture", &["overture"]),
                entry("SUNLU", &["sunlu"]),
                entry("Creality", &["creality"]),
                entry("Anycubic", &["anycubic"]),
                entry("Elegoo", &["elegoo"]),
            ],
            // Longer material names come first so "PLA+" is not swallowed
            // by the plain "PLA" entry.
            materials: vec![
                entry("PLA+", &["pla+", "pla plus", "pla pro"]),
                entry("PETG", &["petg", "pet-g"]),
                entry("PLA", &["pla"]),
                entry("ABS", &["abs"]),
                entry("TPU", &["tpu", "flex"]),
                entry("ASA", &["asa"]),
                entry("PC", &["polycarbonate", "pc"]),
                entry("Nylon", &["nylon", "pa12", "pa6", "pa"]),
                entry("PVA", &["pva"]),
                entry("HIPS", &["hips"]),
            ],
            colors: vec![
                entry("Black", &["black"]),
                entry("White", &["white"]),
                entry("Red", &["red"]),
                entry("Blue", &["blue"]),
                entry("Green", &["green"]),
                entry("Yellow", &["yellow"]),
                entry("Orange", &["orange"]),
                entry("Purple", &["purple"]),
                entry("Pink", &["pink"]),
                entry("Gray", &["gray", "grey"]),
                entry("Silver", &["silver"]),
                entry("Gold", &["gold"]),
                entry("Brown", &["brown"]),
                entry("Clear", &["clear", "transparent"]),
                entry("Natural", &["natural"]),
                entry("Cyan", &["cyan"]),
                entry("Magenta", &["magenta"]),
            ],
            vendors: vec![
                entry("Bambu Lab", &["bambu lab", "bambulab"]),
                entry("Prusa Research", &["prusa research", "prusa3d", "prusa"]),
                entry("Amazon", &["amazon"]),
                entry("AliExpress", &["aliexpress"]),
                entry("MatterHackers", &["matterhackers"]),
                entry("eSUN", &["esun"]),
            ],
            product_lines: vec![
                entry("Basic", &["basic"]),
                entry("Matte", &["matte"]),
                entry("Silk", &["silk"]),
                entry("Galaxy", &["galaxy"]),
                entry("PolyTerra", &["polyterra"]),
                entry("PolyLite", &["polylite"]),
                entry("Tough", &["tough"]),
            ],
        }
    }
}

fn entry(canonical: &'static str, variants: &'static [&'static str]) -> VocabEntry {
    VocabEntry {
        canonical,
        variants,
    }
}

impl Vocabulary {
    pub fn match_brand(&self, text: &str) -> Option<String> {
        match_in(&self.brands, text)
    }

    pub fn match_material(&self, text: &str) -> Option<String> {
        match_in(&self.materials, text)
    }

    pub fn match_color(&self, text: &str) -> Option<String> {
        match_in(&self.colors, text)
    }

    pub fn match_vendor(&self, text: &str) -> Option<String> {
        match_in(&self.vendors, text)
    }

    pub fn match_product_line(&self, text: &str) -> Option<String> {
        match_in(&self.product_lines, text)
    }

    /// Number of distinct vocabulary entries (brand, material, color) that
    /// appear in `text`. Used as a signal when scoring OCR strategies.
    pub fn vocab_hits(&self, text: &str) -> u32 {
        let normalized = normalize(text);
        let tokens = tokenize(&normalized);
        [&self.brands, &self.materials, &self.colors]
            .iter()
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| entry_matches(e, &normalized, &tokens))
                    .count() as u32
            })
            .sum()
    }
}

fn match_in(entries: &[VocabEntry], text: &str) -> Option<String> {
    let normalized = normalize(text);
    let tokens = tokenize(&normalized);
    entries
        .iter()
        .find(|e| entry_matches(e, &normalized, &tokens))
        .map(|e| e.canonical.to_string())
}

fn entry_matches(entry: &VocabEntry, normalized: &str, tokens: &[&str]) -> bool {
    for variant in entry.variants {
        // Multi-word or symbol-bearing variants are matched as substrings
        // of the whole normalized text; single tokens get fuzzy matching.
        if variant.contains(' ') || variant.contains('+') || variant.contains('-') {
            if normalized.contains(variant) {
                return true;
            }
        } else if tokens.iter().any(|t| fuzzy_token_match(t, variant)) {
            return true;
        }
    }
    false
}

/// Lowercase and collapse runs of whitespace to single spaces.
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn tokenize(normalized: &str) -> Vec<&str> {
    normalized
        .split(|c: char| !(c.is_alphanumeric() || c == '+'))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Edit-distance budget scales with the token length: short tokens must
/// match exactly, medium tokens tolerate one substitution, long ones two.
fn fuzzy_token_match(token: &str, variant: &str) -> bool {
    let budget = match variant.chars().count() {
        0..=3 => 0,
        4..=7 => 1,
        _ => 2,
    };
    if budget == 0 {
        return token == variant;
    }
    levenshtein(token, variant) <= budget
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Find a plausible filament diameter: a decimal like `1.75` adjacent to a
/// millimeter marker. Values outside 1.0..=3.5 are treated as noise.
pub fn extract_diameter(text: &str) -> Option<f64> {
    let re = Regex::new(r"(?i)(?:^|[^\d.])(\d\.\d{1,2})\s*mm").ok()?;
    for cap in re.captures_iter(text) {
        if let Ok(value) = cap[1].parse::<f64>() {
            if (1.0..=3.5).contains(&value) {
                return Some(value);
            }
        }
    }
    None
}

/// A contiguous run of 8+ digits, as printed under EAN/UPC barcodes.
pub fn extract_barcode(text: &str) -> Option<String> {
    let re = Regex::new(r"\d{8,}").ok()?;
    re.find(text).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_matching_is_case_insensitive() {
        let vocab = Vocabulary::default();
        assert_eq!(vocab.match_material("pla"), Some("PLA".to_string()));
        assert_eq!(vocab.match_material("PLA"), Some("PLA".to_string()));
        assert_eq!(vocab.match_material("Pla"), Some("PLA".to_string()));
    }

    #[test]
    fn pla_plus_wins_over_pla() {
        let vocab = Vocabulary::default();
        assert_eq!(
            vocab.match_material("eSUN PLA+ Black 1.75mm"),
            Some("PLA+".to_string())
        );
    }

    #[test]
    fn fuzzy_tolerates_single_ocr_error() {
        let vocab = Vocabulary::default();
        // "PETC" is one substitution away from "PETG".
        assert_eq!(vocab.match_material("PETC 1kg"), Some("PETG".to_string()));
        // Short tokens must match exactly: "PLB" is not "PLA".
        assert_eq!(vocab.match_material("PLB 1kg"), None);
    }

    #[test]
    fn multiword_brand_variants() {
        let vocab = Vocabulary::default();
        assert_eq!(
            vocab.match_brand("BAMBU LAB PLA Basic"),
            Some("Bambu Lab".to_string())
        );
        assert_eq!(
            vocab.match_brand("bambulab petg"),
            Some("Bambu Lab".to_string())
        );
    }

    #[test]
    fn diameter_in_range() {
        assert_eq!(extract_diameter("Diameter: 1.75mm"), Some(1.75));
        assert_eq!(extract_diameter("2.85 mm filament"), Some(2.85));
        // Out of the plausible range.
        assert_eq!(extract_diameter("0.4mm nozzle"), None);
        // Embedded in a larger number.
        assert_eq!(extract_diameter("12.75mm"), None);
    }

    #[test]
    fn barcode_needs_eight_digits() {
        assert_eq!(
            extract_barcode("EAN 6975337770305"),
            Some("6975337770305".to_string())
        );
        assert_eq!(extract_barcode("order 1234567"), None);
    }

    #[test]
    fn vocab_hits_counts_distinct_entries() {
        let vocab = Vocabulary::default();
        assert_eq!(vocab.vocab_hits("Polymaker PLA Black"), 3);
        assert_eq!(vocab.vocab_hits("nothing relevant here"), 0);
    }
}
