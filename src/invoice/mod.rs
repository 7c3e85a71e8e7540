//! Invoice Extractor: vendor purchase PDF in, order header + line items out.
//!
//! Vendors are visually heterogeneous but internally consistent, so parsing
//! is a registry of per-vendor strategies behind one `VendorParser`
//! contract, with a keyword-anchored generic parser as the fallback. New
//! vendors are added by registering a parser, never by modifying one.

mod amazon;
mod bambu;
mod generic;
mod prusa;

use crate::error::ExtractionError;
use crate::pdf_text;
use crate::vocab::{self, Vocabulary};
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use time::Date;
use time::macros::format_description;
use tracing::{debug, info};

/// Order header plus line items extracted from one invoice document.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedInvoice {
    pub order_number: String,
    pub order_date: Option<Date>,
    pub vendor: String,
    pub total_amount: Option<f64>,
    pub currency: String,
    pub items: Vec<ParsedLineItem>,
}

/// One filament line item, mapped onto product attributes.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedLineItem {
    pub brand: String,
    pub material: String,
    pub color_name: String,
    pub diameter_mm: f64,
    pub product_line: Option<String>,
    pub sku: Option<String>,
    pub quantity: u32,
    pub price: Option<f64>,
}

/// One vendor's parsing strategy. `matches` fingerprints the document text;
/// `parse` extracts the order and its items.
pub trait VendorParser: Send + Sync {
    fn name(&self) -> &'static str;
    fn matches(&self, text: &str) -> bool;
    fn parse(&self, text: &str, vocab: &Vocabulary) -> ParsedInvoice;
}

pub struct InvoiceExtractor {
    vocab: Arc<Vocabulary>,
    parsers: Vec<Box<dyn VendorParser>>,
}

impl InvoiceExtractor {
    pub fn new(vocab: Arc<Vocabulary>) -> Self {
        // Ordered: specific vendors first, generic fallback last (it
        // matches everything).
        Self {
            vocab,
            parsers: vec![
                Box::new(bambu::BambuParser),
                Box::new(prusa::PrusaParser),
                Box::new(amazon::AmazonParser),
                Box::new(generic::GenericParser),
            ],
        }
    }

    /// Full pipeline: PDF bytes -> text layer -> vendor parse.
    pub fn parse(&self, pdf_bytes: &[u8]) -> Result<ParsedInvoice, ExtractionError> {
        let text = pdf_text::extract_text(pdf_bytes)?;
        self.parse_text(&text)
    }

    /// Parse already-extracted invoice text.
    pub fn parse_text(&self, text: &str) -> Result<ParsedInvoice, ExtractionError> {
        let parser = self
            .parsers
            .iter()
            .find(|p| p.matches(text))
            .ok_or_else(|| {
                ExtractionError::InvalidDocument("no vendor layout matched".to_string())
            })?;
        info!(vendor = parser.name(), "vendor layout identified");

        let invoice = parser.parse(text, &self.vocab);
        if invoice.items.is_empty() {
            return Err(ExtractionError::NoItemsFound);
        }
        debug!(
            order_number = %invoice.order_number,
            vendor = %invoice.vendor,
            items = invoice.items.len(),
            total = ?invoice.total_amount,
            "invoice parsed"
        );
        Ok(invoice)
    }
}

// ---------------------------------------------------------------------------
// Helpers shared by the vendor parsers
// ---------------------------------------------------------------------------

/// Map a free-text item description onto product attributes. Returns `None`
/// when no material is recognized: such segments (shipping fees, unrelated
/// merchandise) are dropped rather than surfaced as malformed items.
pub(crate) fn item_from_description(
    vocab: &Vocabulary,
    description: &str,
    default_brand: &str,
    quantity: u32,
    price: Option<f64>,
) -> Option<ParsedLineItem> {
    let material = vocab.match_material(description)?;
    Some(ParsedLineItem {
        brand: vocab
            .match_brand(description)
            .unwrap_or_else(|| default_brand.to_string()),
        material,
        color_name: vocab
            .match_color(description)
            .unwrap_or_else(|| "Unknown".to_string()),
        // 1.75 is the overwhelmingly common diameter; used when the
        // description does not state one.
        diameter_mm: vocab::extract_diameter(description).unwrap_or(1.75),
        product_line: vocab.match_product_line(description),
        sku: extract_sku(description),
        quantity: quantity.max(1),
        price,
    })
}

fn extract_sku(description: &str) -> Option<String> {
    let re = Regex::new(r"(?i)\bSKU[:#\s]+([A-Z0-9][A-Z0-9-]{2,})").ok()?;
    re.captures(description).map(|c| c[1].to_string())
}

/// Parse a price string, stripping currency symbols and thousand
/// separators.
pub(crate) fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse().ok()
}

/// Detect the invoice currency from symbols or ISO codes in the text.
pub(crate) fn detect_currency(text: &str, default: &str) -> String {
    let re = Regex::new(r"(?i)\b(USD|US\$|EUR|GBP|CZK|CNY|JPY)\b").ok();
    if let Some(re) = re {
        if let Some(cap) = re.captures(text) {
            let raw = cap[1].to_uppercase();
            return if raw == "US$" { "USD".to_string() } else { raw };
        }
    }
    if text.contains('€') {
        "EUR".to_string()
    } else if text.contains('£') {
        "GBP".to_string()
    } else if text.contains('$') {
        "USD".to_string()
    } else {
        default.to_string()
    }
}

/// Parse a date in any of the formats the known vendors use: textual
/// ("January 15, 2025"), dotted ("15.01.2025"), US slashes ("01/15/2025"),
/// or ISO ("2025-01-15").
pub(crate) fn parse_date_any(raw: &str) -> Option<Date> {
    let trimmed = raw.trim();
    if let Some(date) = parse_textual_date(trimmed) {
        return Some(date);
    }
    let dotted = format_description!("[day].[month].[year]");
    let slashed = format_description!("[month]/[day]/[year]");
    let iso = format_description!("[year]-[month]-[day]");
    Date::parse(trimmed, dotted)
        .or_else(|_| Date::parse(trimmed, slashed))
        .or_else(|_| Date::parse(trimmed, iso))
        .ok()
}

/// "January 15, 2025" and similar. The month is re-capitalized first so
/// OCR-style case variance does not break parsing.
pub(crate) fn parse_textual_date(raw: &str) -> Option<Date> {
    let mut parts = raw.trim().splitn(2, ' ');
    let month = parts.next()?;
    let rest = parts.next()?;
    let mut chars = month.chars();
    let first = chars.next()?.to_uppercase().to_string();
    let normalized = format!("{first}{} {rest}", chars.as_str().to_lowercase());
    let format = format_description!("[month repr:long] [day padding:none], [year]");
    Date::parse(&normalized, format).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn extractor() -> InvoiceExtractor {
        InvoiceExtractor::new(Arc::new(Vocabulary::default()))
    }

    #[test]
    fn date_formats() {
        assert_eq!(parse_date_any("January 15, 2025"), Some(date!(2025 - 01 - 15)));
        assert_eq!(parse_date_any("JANUARY 15, 2025"), Some(date!(2025 - 01 - 15)));
        assert_eq!(parse_date_any("15.01.2025"), Some(date!(2025 - 01 - 15)));
        assert_eq!(parse_date_any("01/15/2025"), Some(date!(2025 - 01 - 15)));
        assert_eq!(parse_date_any("2025-01-15"), Some(date!(2025 - 01 - 15)));
        assert_eq!(parse_date_any("not a date"), None);
    }

    #[test]
    fn price_strips_symbols() {
        assert_eq!(parse_price("$19.99"), Some(19.99));
        assert_eq!(parse_price("1,299.50 EUR"), Some(1299.5));
        assert_eq!(parse_price("free"), None);
    }

    #[test]
    fn currency_detection() {
        assert_eq!(detect_currency("Total 29.99 EUR", "USD"), "EUR");
        assert_eq!(detect_currency("Total US$ 29.99", "EUR"), "USD");
        assert_eq!(detect_currency("Total $29.99", "EUR"), "USD");
        assert_eq!(detect_currency("Total 29.99", "USD"), "USD");
    }

    #[test]
    fn non_filament_description_is_dropped() {
        let vocab = Vocabulary::default();
        assert!(
            item_from_description(&vocab, "Standard Shipping", "Unknown", 1, Some(9.99)).is_none()
        );
        let item =
            item_from_description(&vocab, "PLA Matte Charcoal 1.75mm", "Bambu Lab", 2, Some(19.99))
                .unwrap();
        assert_eq!(item.material, "PLA");
        assert_eq!(item.product_line.as_deref(), Some("Matte"));
        assert_eq!(item.quantity, 2);
        assert_eq!(item.diameter_mm, 1.75);
    }

    #[test]
    fn unmatched_items_are_dropped_not_fatal() {
        // Three line items, one with no recognizable material: the result
        // has exactly two items.
        let text = "\
Bambu Lab
Order #US1234567890
Order date: January 15, 2025

Item  Qty  Price
PLA Basic Filament - Black (1.75mm)    2    $19.99
Mini Screwdriver Set    1    $7.99
PETG HF Filament - Blue (1.75mm)    1    $22.99

Total    $70.96
";
        let invoice = extractor().parse_text(text).unwrap();
        assert_eq!(invoice.items.len(), 2);
        assert_eq!(invoice.items[0].material, "PLA");
        assert_eq!(invoice.items[1].material, "PETG");
    }

    #[test]
    fn all_items_dropped_is_no_items_found() {
        let text = "\
Bambu Lab
Order #US1111111111
Order date: February 2, 2025

Item  Qty  Price
AMS Lite Accessory Kit    1    $49.99

Total    $49.99
";
        assert!(matches!(
            extractor().parse_text(text),
            Err(ExtractionError::NoItemsFound)
        ));
    }

    #[test]
    fn unknown_layout_falls_back_to_generic() {
        let text = "\
Filament Warehouse Ltd
Invoice No: FW-2025-0042
Invoice Date: 2025-03-10

1 x Overture PETG Gray 1.75mm spool    18.50
Grand Total: 18.50
";
        let invoice = extractor().parse_text(text).unwrap();
        assert_eq!(invoice.order_number, "FW-2025-0042");
        assert_eq!(invoice.items.len(), 1);
        assert_eq!(invoice.items[0].brand, "Overture");
        assert_eq!(invoice.items[0].material, "PETG");
    }
}
