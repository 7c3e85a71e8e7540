//! Amazon order invoices: `NNN-NNNNNNN-NNNNNNN` order number, "Order
//! Placed" textual date, item rows of `<n> of: description  $price`.

use super::{
    ParsedInvoice, VendorParser, detect_currency, item_from_description, parse_price,
    parse_textual_date,
};
use crate::vocab::Vocabulary;
use regex::Regex;

pub struct AmazonParser;

impl VendorParser for AmazonParser {
    fn name(&self) -> &'static str {
        "Amazon"
    }

    fn matches(&self, text: &str) -> bool {
        text.to_lowercase().contains("amazon")
    }

    fn parse(&self, text: &str, vocab: &Vocabulary) -> ParsedInvoice {
        let order_number = Regex::new(r"(?i)order\s+number\s*:?\s*(\d{3}-\d{7}-\d{7})")
            .ok()
            .and_then(|re| re.captures(text).map(|c| c[1].to_string()))
            .unwrap_or_else(|| "UNKNOWN".to_string());

        let order_date = Regex::new(r"(?i)Order\s+Placed\s*:?\s*([A-Za-z]+\s+\d{1,2},\s*\d{4})")
            .ok()
            .and_then(|re| re.captures(text))
            .and_then(|c| parse_textual_date(&c[1]));

        let total_amount = Regex::new(r"(?i)Grand\s+Total\s*:?\s*\$?([\d,]+\.\d{2})")
            .ok()
            .and_then(|re| re.captures(text).and_then(|c| parse_price(&c[1])));

        // Amazon lists marketplace goods of every kind; the material filter
        // in `item_from_description` keeps only filament rows.
        let mut items = Vec::new();
        if let Ok(row_re) = Regex::new(r"(?m)^(\d+)\s+of:?\s+(.+?)\s+\$([\d,]+\.\d{2})\s*$") {
            for cap in row_re.captures_iter(text) {
                let quantity: u32 = cap[1].parse().unwrap_or(1);
                let price = parse_price(&cap[3]);
                if let Some(item) =
                    item_from_description(vocab, cap[2].trim(), "Unknown", quantity, price)
                {
                    items.push(item);
                }
            }
        }

        ParsedInvoice {
            order_number,
            order_date,
            vendor: "Amazon".to_string(),
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
    fn parses_amazon_order_invoice() {
        let text = "\
amazon.com
Final Details for Order #113-4362271-6618040
Order Placed: February 16, 2025
Amazon.com order number: 113-4362271-6618040

Items Ordered
2 of: HATCHBOX PLA 3D Printer Filament, Dimensional Accuracy +/- 0.03 mm, 1.75 mm, Black    $24.99
1 of: USB-C Charging Cable 6ft    $8.99
1 of: OVERTURE TPU Filament 1.75mm Flexible, Blue    $21.99

Grand Total: $80.96
";
        let invoice = AmazonParser.parse(text, &Vocabulary::default());
        assert_eq!(invoice.order_number, "113-4362271-6618040");
        assert_eq!(invoice.order_date, Some(date!(2025 - 02 - 16)));
        assert_eq!(invoice.total_amount, Some(80.96));
        assert_eq!(invoice.items.len(), 2);

        let first = &invoice.items[0];
        assert_eq!(first.brand, "Hatchbox");
        assert_eq!(first.material, "PLA");
        assert_eq!(first.color_name, "Black");
        assert_eq!(first.diameter_mm, 1.75);
        assert_eq!(first.quantity, 2);

        let second = &invoice.items[1];
        assert_eq!(second.brand, "Overture");
        assert_eq!(second.material, "TPU");
        assert_eq!(second.color_name, "Blue");
    }
}
