//! Fallback parser for unrecognized vendor layouts: keyword-anchored
//! regexes for the order header, then a line-by-line scan where any row
//! with a recognizable material becomes an item. Best-effort by design.

use super::{
    ParsedInvoice, VendorParser, detect_currency, item_from_description, parse_date_any,
    parse_price,
};
use crate::vocab::Vocabulary;
use regex::Regex;

pub struct GenericParser;

impl VendorParser for GenericParser {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn matches(&self, _text: &str) -> bool {
        true
    }

    fn parse(&self, text: &str, vocab: &Vocabulary) -> ParsedInvoice {
        let order_number =
            Regex::new(r"(?i)(?:Order|Invoice)\s*(?:No\.?|Number|#)\s*:?\s*([A-Za-z0-9\-/]+)")
                .ok()
                .and_then(|re| re.captures(text).map(|c| c[1].to_string()))
                .unwrap_or_else(|| "UNKNOWN".to_string());

        let order_date = Regex::new(
            r"(?i)(?:Order|Invoice)\s+Date\s*:?\s*([A-Za-z]+\s+\d{1,2},?\s+\d{4}|\d{1,2}[./]\d{1,2}[./]\d{2,4}|\d{4}-\d{2}-\d{2})",
        )
        .ok()
        .and_then(|re| re.captures(text))
        .and_then(|c| parse_date_any(&c[1]));

        // Known vendor name anywhere in the text, else the first non-empty
        // line (invoices lead with the issuing company).
        let vendor = vocab.match_vendor(text).unwrap_or_else(|| {
            text.lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .unwrap_or("Unknown")
                .to_string()
        });

        let total_amount =
            Regex::new(r"(?i)(?:grand\s+)?total\s*:?\s*(?:US\$|\$|€|£)?\s*([\d,]+\.\d{2})")
                .ok()
                .and_then(|re| {
                    re.captures_iter(text)
                        .last()
                        .and_then(|c| parse_price(&c[1]))
                });

        let items = extract_items(text, vocab);

        ParsedInvoice {
            order_number,
            order_date,
            vendor,
            total_amount,
            currency: detect_currency(text, "USD"),
            items,
        }
    }
}

fn extract_items(text: &str, vocab: &Vocabulary) -> Vec<super::ParsedLineItem> {
    let skip_re = Regex::new(r"(?i)\b(subtotal|total|tax|shipping|invoice|order|payment)\b").ok();
    let qty_re = Regex::new(r"(?i)^\s*(\d+)\s*(?:x|of:?|pcs)\s+").ok();
    let price_re = Regex::new(r"([\d,]+\.\d{2})").ok();

    let mut items = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if skip_re.as_ref().is_some_and(|re| re.is_match(line)) {
            continue;
        }

        let quantity = qty_re
            .as_ref()
            .and_then(|re| re.captures(line))
            .and_then(|c| c[1].parse::<u32>().ok())
            .unwrap_or(1);
        // The last decimal on the row is taken as the price; earlier
        // decimals are usually part of the description (e.g. "1.75mm").
        let price = price_re.as_ref().and_then(|re| {
            re.captures_iter(line)
                .last()
                .and_then(|c| parse_price(&c[1]))
        });
        // A diameter reading doubling as the only decimal is not a price.
        let price = price.filter(|p| crate::vocab::extract_diameter(line) != Some(*p));

        if let Some(item) = item_from_description(vocab, line, "Unknown", quantity, price) {
            items.push(item);
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn parses_unknown_vendor_layout() {
        let text = "\
MatterHackers
Order Number: MH-884213
Order Date: 03/10/2025

1 x MH Build Series PLA Red 1.75mm 1kg    17.58
2 x SUNLU PETG White 1.75mm    15.99

Subtotal: 49.56
Total: 56.55
";
        let invoice = GenericParser.parse(text, &Vocabulary::default());
        assert_eq!(invoice.order_number, "MH-884213");
        assert_eq!(invoice.order_date, Some(date!(2025 - 03 - 10)));
        assert_eq!(invoice.vendor, "MatterHackers");
        assert_eq!(invoice.total_amount, Some(56.55));
        assert_eq!(invoice.items.len(), 2);

        let first = &invoice.items[0];
        assert_eq!(first.material, "PLA");
        assert_eq!(first.color_name, "Red");
        assert_eq!(first.quantity, 1);
        assert_eq!(first.price, Some(17.58));

        let second = &invoice.items[1];
        assert_eq!(second.brand, "SUNLU");
        assert_eq!(second.quantity, 2);
    }

    #[test]
    fn diameter_is_not_mistaken_for_price() {
        let text = "\
Some Shop
Invoice No: 77

1 x eSUN ABS Black 1.75mm
Total: 19.99
";
        let invoice = GenericParser.parse(text, &Vocabulary::default());
        assert_eq!(invoice.items.len(), 1);
        assert_eq!(invoice.items[0].price, None);
    }
}
