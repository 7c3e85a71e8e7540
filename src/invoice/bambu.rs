//! Bambu Lab store invoices: `Order #<id>`, textual order date, item rows
//! of `description  qty  $price` in a column layout.

use super::{
    ParsedInvoice, VendorParser, detect_currency, item_from_description, parse_price,
    parse_textual_date,
};
use crate::vocab::Vocabulary;
use regex::Regex;

pub struct BambuParser;

impl VendorParser for BambuParser {
    fn name(&self) -> &'static str {
        "Bambu Lab"
    }

    fn matches(&self, text: &str) -> bool {
        let t = text.to_lowercase();
        t.contains("bambu lab") || t.contains("bambulab")
    }

    fn parse(&self, text: &str, vocab: &Vocabulary) -> ParsedInvoice {
        let order_number = Regex::new(r"(?i)Order\s*#\s*([A-Z0-9][A-Z0-9-]*)")
            .ok()
            .and_then(|re| re.captures(text).map(|c| c[1].to_string()))
            .unwrap_or_else(|| "UNKNOWN".to_string());

        let order_date = Regex::new(r"(?i)Order\s+date\s*:?\s*([A-Za-z]+\s+\d{1,2},\s*\d{4})")
            .ok()
            .and_then(|re| re.captures(text))
            .and_then(|c| parse_textual_date(&c[1]));

        let total_amount = Regex::new(r"(?i)\bTotal\s+\$?([\d,]+\.\d{2})")
            .ok()
            .and_then(|re| {
                re.captures_iter(text)
                    .last()
                    .and_then(|c| parse_price(&c[1]))
            });

        // Item rows: description, quantity, price separated by column gaps.
        // Fee rows (shipping, accessories) either miss the quantity column
        // or carry no recognizable material and are dropped.
        let mut items = Vec::new();
        if let Ok(row_re) = Regex::new(r"(?m)^(.+?)\s{2,}(\d+)\s{2,}\$?([\d,]+\.\d{2})\s*$") {
            for cap in row_re.captures_iter(text) {
                let quantity: u32 = cap[2].parse().unwrap_or(1);
                let price = parse_price(&cap[3]);
                if let Some(item) =
                    item_from_description(vocab, cap[1].trim(), "Bambu Lab", quantity, price)
                {
                    items.push(item);
                }
            }
        }

        ParsedInvoice {
            order_number,
            order_date,
            vendor: "Bambu Lab".to_string(),
            total_amount,
            currency: detect_currency(text, "USD"),
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn parses_bambu_store_invoice() {
        let text = "\
Bambu Lab US
Order #US7001234567
Order date: March 3, 2025

Item  Qty  Price
PLA Basic Filament - Jade White (1.75mm)    3    $19.99
PLA Matte Filament - Charcoal (1.75mm)    1    $20.99
Expedited Shipping    $12.00

Total    $92.96
";
        let invoice = BambuParser.parse(text, &Vocabulary::default());
        assert_eq!(invoice.order_number, "US7001234567");
        assert_eq!(invoice.order_date, Some(date!(2025 - 03 - 03)));
        assert_eq!(invoice.vendor, "Bambu Lab");
        assert_eq!(invoice.total_amount, Some(92.96));
        assert_eq!(invoice.currency, "USD");
        assert_eq!(invoice.items.len(), 2);

        let first = &invoice.items[0];
        assert_eq!(first.brand, "Bambu Lab");
        assert_eq!(first.material, "PLA");
        assert_eq!(first.color_name, "White");
        assert_eq!(first.diameter_mm, 1.75);
        assert_eq!(first.product_line.as_deref(), Some("Basic"));
        assert_eq!(first.quantity, 3);
        assert_eq!(first.price, Some(19.99));
    }

    #[test]
    fn fingerprint_requires_vendor_name() {
        assert!(BambuParser.matches("Thanks for shopping at Bambu Lab!"));
        assert!(!BambuParser.matches("Prusa Research invoice"));
    }
}
