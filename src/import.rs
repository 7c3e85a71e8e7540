//! Invoice import: map parsed line items onto catalog products and stage
//! one spool row per purchased unit.
//!
//! Runs inside a single transaction so the existence-check-then-insert of
//! a product is atomic and a failure partway leaves the store unchanged.
//! Re-importing the same invoice duplicates spools by design (each
//! physical spool is a distinct inventory unit) but never products.

use crate::error::ExtractionError;
use crate::invoice::ParsedInvoice;
use crate::store::{self, InventoryStore, ProductInput, ProductKey, SpoolInput, SpoolStatus};
use serde::Serialize;
use time::Date;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub success: bool,
    pub products_created: u32,
    pub spools_created: u32,
    pub order_number: String,
    pub order_date: Option<Date>,
    pub vendor: String,
    pub items: Vec<ImportedItem>,
}

#[derive(Debug, Serialize)]
pub struct ImportedItem {
    pub product_id: i64,
    pub brand: String,
    pub material: String,
    pub color_name: String,
    pub quantity: u32,
    pub price: Option<f64>,
}

pub fn import_invoice(
    store: &mut InventoryStore,
    invoice: &ParsedInvoice,
) -> Result<ImportSummary, ExtractionError> {
    let tx = store.transaction().map_err(internal)?;

    let mut products_created = 0u32;
    let mut spools_created = 0u32;
    let mut items = Vec::with_capacity(invoice.items.len());

    for item in &invoice.items {
        let key = ProductKey {
            brand: item.brand.clone(),
            material: item.material.clone(),
            color_name: item.color_name.clone(),
            diameter_mm: item.diameter_mm,
        };
        let product_id = match store::find_product_by_key(&tx, &key).map_err(internal)? {
            Some(existing) => existing.id,
            None => {
                let id = store::insert_product_row(
                    &tx,
                    &ProductInput {
                        brand: item.brand.clone(),
                        line: item.product_line.clone(),
                        material: item.material.clone(),
                        color_name: item.color_name.clone(),
                        diameter_mm: item.diameter_mm,
                        notes: None,
                        barcode: None,
                        sku: item.sku.clone(),
                    },
                )
                .map_err(internal)?;
                products_created += 1;
                id
            }
        };

        for _ in 0..item.quantity {
            store::insert_spool_row(
                &tx,
                &SpoolInput {
                    product_id,
                    purchase_date: invoice.order_date,
                    vendor: Some(invoice.vendor.clone()),
                    price: item.price,
                    storage_location: None,
                    status: SpoolStatus::InStock,
                },
            )
            .map_err(internal)?;
            spools_created += 1;
        }

        items.push(ImportedItem {
            product_id,
            brand: item.brand.clone(),
            material: item.material.clone(),
            color_name: item.color_name.clone(),
            quantity: item.quantity,
            price: item.price,
        });
    }

    tx.commit().map_err(internal)?;
    info!(
        order_number = %invoice.order_number,
        vendor = %invoice.vendor,
        products_created,
        spools_created,
        "invoice imported"
    );

    Ok(ImportSummary {
        success: true,
        products_created,
        spools_created,
        order_number: invoice.order_number.clone(),
        order_date: invoice.order_date,
        vendor: invoice.vendor.clone(),
        items,
    })
}

fn internal(e: rusqlite::Error) -> ExtractionError {
    ExtractionError::Unexpected(format!("storage failure: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::ParsedLineItem;
    use time::macros::date;

    fn sample_invoice() -> ParsedInvoice {
        ParsedInvoice {
            order_number: "US7001234567".to_string(),
            order_date: Some(date!(2025 - 03 - 03)),
            vendor: "Bambu Lab".to_string(),
            total_amount: Some(92.96),
            currency: "USD".to_string(),
            items: vec![
                ParsedLineItem {
                    brand: "Bambu Lab".to_string(),
                    material: "PLA".to_string(),
                    color_name: "White".to_string(),
                    diameter_mm: 1.75,
                    product_line: Some("Basic".to_string()),
                    sku: None,
                    quantity: 2,
                    price: Some(19.99),
                },
                ParsedLineItem {
                    brand: "Bambu Lab".to_string(),
                    material: "PLA".to_string(),
                    color_name: "Charcoal".to_string(),
                    diameter_mm: 1.75,
                    product_line: Some("Matte".to_string()),
                    sku: None,
                    quantity: 3,
                    price: Some(20.99),
                },
            ],
        }
    }

    #[test]
    fn import_creates_products_and_one_spool_per_unit() {
        let mut store = InventoryStore::in_memory().unwrap();
        let summary = import_invoice(&mut store, &sample_invoice()).unwrap();

        assert!(summary.success);
        assert_eq!(summary.products_created, 2);
        assert_eq!(summary.spools_created, 5);
        assert_eq!(summary.items.len(), 2);
        assert_eq!(store.list_products().unwrap().len(), 2);

        let spools = store.list_spools().unwrap();
        assert_eq!(spools.len(), 5);
        for spool in &spools {
            assert_eq!(spool.status, SpoolStatus::InStock);
            assert_eq!(spool.vendor.as_deref(), Some("Bambu Lab"));
            assert_eq!(spool.purchase_date, Some(date!(2025 - 03 - 03)));
        }
    }

    #[test]
    fn reimport_duplicates_spools_but_not_products() {
        let mut store = InventoryStore::in_memory().unwrap();
        let invoice = sample_invoice();

        let first = import_invoice(&mut store, &invoice).unwrap();
        assert_eq!(first.products_created, 2);
        assert_eq!(first.spools_created, 5);

        let second = import_invoice(&mut store, &invoice).unwrap();
        assert_eq!(second.products_created, 0);
        assert_eq!(second.spools_created, 5);

        assert_eq!(store.list_products().unwrap().len(), 2);
        assert_eq!(store.list_spools().unwrap().len(), 10);
    }

    #[test]
    fn product_line_and_price_carried_onto_rows() {
        let mut store = InventoryStore::in_memory().unwrap();
        import_invoice(&mut store, &sample_invoice()).unwrap();

        let products = store.list_products().unwrap();
        assert_eq!(products[0].line.as_deref(), Some("Basic"));
        assert_eq!(products[1].line.as_deref(), Some("Matte"));

        let spools = store.list_spools().unwrap();
        assert_eq!(spools[0].price, Some(19.99));
        assert_eq!(spools[4].price, Some(20.99));
    }
}
