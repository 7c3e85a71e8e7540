//! Prusa Research invoices: numeric invoice number, dotted issue date,
//! item rows of `description  <n> pcs  <price> EUR`.

use super::{
    ParsedInvoice, VendorParser, detect_currency, item_from_description, parse_date_any,
    parse_price,
};
use crate::vocab::Vocabulary;
use regex::Regex;

pub struct PrusaParser;

impl VendorParser for PrusaParser {
    fn name(&self) -> &'static str {
        "Prusa Research"
    }

    fn matches(&self, text: &str) -> bool {
        text.to_lowercase().contains("prusa")
    }

    fn parse(&self, text: &str, vocab: &Vocabulary) -> ParsedInvoice {
        let order_number = Regex::new(r"(?i)Invoice\s+no\.?\s*:?\s*([A-Z0-9-]+)")
            .ok()
            .and_then(|re| re.captures(text).map(|c| c[1].to_string()))
            .unwrap_or_else(|| "UNKNOWN".to_string());

        let order_date = Regex::new(r"(?i)Date\s+of\s+issue\s*:?\s*(\d{1,2}\.\d{1,2}\.\d{4})")
            .ok()
            .and_then(|re| re.captures(text))
            .and_then(|c| parse_date_any(&c[1]));

        let total_amount = Regex::new(r"(?i)\bTotal\s*:?\s*([\d,]+\.\d{2})")
            .ok()
            .and_then(|re| {
                re.captures_iter(text)
                    .last()
                    .and_then(|c| parse_price(&c[1]))
            });

        let mut items = Vec::new();
        if let Ok(row_re) =
            Regex::new(r"(?m)^(.+?)\s{2,}(\d+)\s*pcs\s+([\d,]+\.\d{2})(?:\s*[A-Z]{3})?\s*$")
        {
            for cap in row_re.captures_iter(text) {
                let quantity: u32 = cap[2].parse().unwrap_or(1);
                let price = parse_price(&cap[3]);
                if let Some(item) =
                    item_from_description(vocab, cap[1].trim(), "Prusament", quantity, price)
                {
                    items.push(item);
                }
            }
        }

        ParsedInvoice {
            order_number,
            order_date,
            vendor: "Prusa Research".to_string(),
            total_amount,
            currency: detect_currency(text, "EUR"),
            items,
        }
    }
}
