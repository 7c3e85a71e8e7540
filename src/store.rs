//! SQLite inventory store: catalog products and physical spools.
//!
//! Products carry the four-field identity key (brand, material, color,
//! diameter); spools reference a product and track one physical unit each.

use rusqlite::{Connection, OptionalExtension, Result as SqliteResult, Row, Transaction, params};
use serde::{Deserialize, Serialize};
use time::Date;
use time::macros::format_description;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpoolStatus {
    InStock,
    UsedUp,
    Donated,
    Lost,
}

impl SpoolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpoolStatus::InStock => "in_stock",
            SpoolStatus::UsedUp => "used_up",
            SpoolStatus::Donated => "donated",
            SpoolStatus::Lost => "lost",
        }
    }

    fn from_str(s: &str) -> SpoolStatus {
        match s {
            "used_up" => SpoolStatus::UsedUp,
            "donated" => SpoolStatus::Donated,
            "lost" => SpoolStatus::Lost,
            _ => SpoolStatus::InStock,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: i64,
    pub brand: String,
    pub line: Option<String>,
    pub material: String,
    pub color_name: String,
    pub diameter_mm: f64,
    pub notes: Option<String>,
    pub barcode: Option<String>,
    pub sku: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub brand: String,
    #[serde(default)]
    pub line: Option<String>,
    pub material: String,
    pub color_name: String,
    pub diameter_mm: f64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub brand: Option<String>,
    pub line: Option<String>,
    pub material: Option<String>,
    pub color_name: Option<String>,
    pub diameter_mm: Option<f64>,
    pub notes: Option<String>,
    pub barcode: Option<String>,
    pub sku: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Spool {
    pub id: i64,
    pub product_id: i64,
    pub purchase_date: Option<Date>,
    pub vendor: Option<String>,
    pub price: Option<f64>,
    pub storage_location: Option<String>,
    pub status: SpoolStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpoolInput {
    pub product_id: i64,
    #[serde(default)]
    pub purchase_date: Option<Date>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub storage_location: Option<String>,
    #[serde(default = "default_status")]
    pub status: SpoolStatus,
}

fn default_status() -> SpoolStatus {
    SpoolStatus::InStock
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpoolUpdate {
    pub product_id: Option<i64>,
    pub purchase_date: Option<Date>,
    pub vendor: Option<String>,
    pub price: Option<f64>,
    pub storage_location: Option<String>,
    pub status: Option<SpoolStatus>,
}

/// The four-field natural key deciding whether a line item refers to an
/// existing catalog product. Matched with exact (case-sensitive) equality.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductKey {
    pub brand: String,
    pub material: String,
    pub color_name: String,
    pub diameter_mm: f64,
}

pub struct InventoryStore {
    conn: Connection,
}

impl InventoryStore {
    pub fn new(db_path: &str) -> SqliteResult<Self> {
        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    /// In-memory store for tests.
    pub fn in_memory() -> SqliteResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> SqliteResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                brand TEXT NOT NULL,
                line TEXT,
                material TEXT NOT NULL,
                color_name TEXT NOT NULL,
                diameter_mm REAL NOT NULL,
                notes TEXT,
                barcode TEXT,
                sku TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS spools (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id INTEGER NOT NULL,
                purchase_date TEXT,
                vendor TEXT,
                price REAL,
                storage_location TEXT,
                status TEXT NOT NULL DEFAULT 'in_stock',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (product_id) REFERENCES products(id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_products_identity
             ON products(brand, material, color_name, diameter_mm)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_spools_product_id ON spools(product_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_spools_status ON spools(status)",
            [],
        )?;

        info!("database initialized");
        Ok(Self { conn })
    }

    /// Begin a transaction for multi-row operations (invoice import).
    pub fn transaction(&mut self) -> SqliteResult<Transaction<'_>> {
        self.conn.transaction()
    }

    // -- products -----------------------------------------------------------

    pub fn insert_product(&self, input: &ProductInput) -> SqliteResult<Product> {
        let id = insert_product_row(&self.conn, input)?;
        self.get_product(id)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    pub fn list_products(&self) -> SqliteResult<Vec<Product>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, brand, line, material, color_name, diameter_mm,
                    notes, barcode, sku, created_at, updated_at
             FROM products ORDER BY id",
        )?;
        let rows = stmt.query_map([], row_to_product)?;
        rows.collect()
    }

    pub fn get_product(&self, id: i64) -> SqliteResult<Option<Product>> {
        self.conn
            .query_row(
                "SELECT id, brand, line, material, color_name, diameter_mm,
                        notes, barcode, sku, created_at, updated_at
                 FROM products WHERE id = ?1",
                params![id],
                row_to_product,
            )
            .optional()
    }

    pub fn update_product(&self, id: i64, update: &ProductUpdate) -> SqliteResult<Option<Product>> {
        let Some(existing) = self.get_product(id)? else {
            return Ok(None);
        };
        let merged = ProductInput {
            brand: update.brand.clone().unwrap_or(existing.brand),
            line: update.line.clone().or(existing.line),
            material: update.material.clone().unwrap_or(existing.material),
            color_name: update.color_name.clone().unwrap_or(existing.color_name),
            diameter_mm: update.diameter_mm.unwrap_or(existing.diameter_mm),
            notes: update.notes.clone().or(existing.notes),
            barcode: update.barcode.clone().or(existing.barcode),
            sku: update.sku.clone().or(existing.sku),
        };
        self.conn.execute(
            "UPDATE products
             SET brand = ?1, line = ?2, material = ?3, color_name = ?4,
                 diameter_mm = ?5, notes = ?6, barcode = ?7, sku = ?8,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = ?9",
            params![
                merged.brand,
                merged.line,
                merged.material,
                merged.color_name,
                merged.diameter_mm,
                merged.notes,
                merged.barcode,
                merged.sku,
                id,
            ],
        )?;
        self.get_product(id)
    }

    pub fn delete_product(&self, id: i64) -> SqliteResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM products WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn find_product_by_key(&self, key: &ProductKey) -> SqliteResult<Option<Product>> {
        find_product_by_key(&self.conn, key)
    }

    // -- spools -------------------------------------------------------------

    pub fn insert_spool(&self, input: &SpoolInput) -> SqliteResult<Spool> {
        let id = insert_spool_row(&self.conn, input)?;
        self.get_spool(id)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    pub fn list_spools(&self) -> SqliteResult<Vec<Spool>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, product_id, purchase_date, vendor, price,
                    storage_location, status, created_at, updated_at
             FROM spools ORDER BY id",
        )?;
        let rows = stmt.query_map([], row_to_spool)?;
        rows.collect()
    }

    pub fn get_spool(&self, id: i64) -> SqliteResult<Option<Spool>> {
        self.conn
            .query_row(
                "SELECT id, product_id, purchase_date, vendor, price,
                        storage_location, status, created_at, updated_at
                 FROM spools WHERE id = ?1",
                params![id],
                row_to_spool,
            )
            .optional()
    }

    pub fn update_spool(&self, id: i64, update: &SpoolUpdate) -> SqliteResult<Option<Spool>> {
        let Some(existing) = self.get_spool(id)? else {
            return Ok(None);
        };
        let merged = SpoolInput {
            product_id: update.product_id.unwrap_or(existing.product_id),
            purchase_date: update.purchase_date.or(existing.purchase_date),
            vendor: update.vendor.clone().or(existing.vendor),
            price: update.price.or(existing.price),
            storage_location: update.storage_location.clone().or(existing.storage_location),
            status: update.status.unwrap_or(existing.status),
        };
        self.conn.execute(
            "UPDATE spools
             SET product_id = ?1, purchase_date = ?2, vendor = ?3, price = ?4,
                 storage_location = ?5, status = ?6, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?7",
            params![
                merged.product_id,
                merged.purchase_date.map(format_date),
                merged.vendor,
                merged.price,
                merged.storage_location,
                merged.status.as_str(),
                id,
            ],
        )?;
        self.get_spool(id)
    }

    pub fn delete_spool(&self, id: i64) -> SqliteResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM spools WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}

// Free functions taking a plain `Connection` so the import step can reuse
// them inside its transaction (`Transaction` derefs to `Connection`).

pub(crate) fn find_product_by_key(
    conn: &Connection,
    key: &ProductKey,
) -> SqliteResult<Option<Product>> {
    conn.query_row(
        "SELECT id, brand, line, material, color_name, diameter_mm,
                notes, barcode, sku, created_at, updated_at
         FROM products
         WHERE brand = ?1 AND material = ?2 AND color_name = ?3 AND diameter_mm = ?4",
        params![key.brand, key.material, key.color_name, key.diameter_mm],
        row_to_product,
    )
    .optional()
}

pub(crate) fn insert_product_row(conn: &Connection, input: &ProductInput) -> SqliteResult<i64> {
    conn.execute(
        "INSERT INTO products (brand, line, material, color_name, diameter_mm, notes, barcode, sku)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            input.brand,
            input.line,
            input.material,
            input.color_name,
            input.diameter_mm,
            input.notes,
            input.barcode,
            input.sku,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn insert_spool_row(conn: &Connection, input: &SpoolInput) -> SqliteResult<i64> {
    conn.execute(
        "INSERT INTO spools (product_id, purchase_date, vendor, price, storage_location, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            input.product_id,
            input.purchase_date.map(format_date),
            input.vendor,
            input.price,
            input.storage_location,
            input.status.as_str(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn row_to_product(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        brand: row.get(1)?,
        line: row.get(2)?,
        material: row.get(3)?,
        color_name: row.get(4)?,
        diameter_mm: row.get(5)?,
        notes: row.get(6)?,
        barcode: row.get(7)?,
        sku: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn row_to_spool(row: &Row<'_>) -> rusqlite::Result<Spool> {
    let purchase_date: Option<String> = row.get(2)?;
    let status: String = row.get(6)?;
    Ok(Spool {
        id: row.get(0)?,
        product_id: row.get(1)?,
        purchase_date: purchase_date.as_deref().and_then(parse_date),
        vendor: row.get(3)?,
        price: row.get(4)?,
        storage_location: row.get(5)?,
        status: SpoolStatus::from_str(&status),
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn format_date(date: Date) -> String {
    let format = format_description!("[year]-[month]-[day]");
    date.format(format).unwrap_or_default()
}

fn parse_date(raw: &str) -> Option<Date> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(raw, format).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn sample_product() -> ProductInput {
        ProductInput {
            brand: "Bambu Lab".to_string(),
            line: Some("Basic".to_string()),
            material: "PLA".to_string(),
            color_name: "Black".to_string(),
            diameter_mm: 1.75,
            notes: None,
            barcode: None,
            sku: None,
        }
    }

    #[test]
    fn product_crud_roundtrip() {
        let store = InventoryStore::in_memory().unwrap();
        let created = store.insert_product(&sample_product()).unwrap();
        assert_eq!(created.brand, "Bambu Lab");

        let fetched = store.get_product(created.id).unwrap().unwrap();
        assert_eq!(fetched.material, "PLA");

        let updated = store
            .update_product(
                created.id,
                &ProductUpdate {
                    color_name: Some("White".to_string()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.color_name, "White");
        assert_eq!(updated.brand, "Bambu Lab");

        assert!(store.delete_product(created.id).unwrap());
        assert!(store.get_product(created.id).unwrap().is_none());
        assert!(!store.delete_product(created.id).unwrap());
    }

    #[test]
    fn identity_key_lookup_is_exact() {
        let store = InventoryStore::in_memory().unwrap();
        store.insert_product(&sample_product()).unwrap();

        let key = ProductKey {
            brand: "Bambu Lab".to_string(),
            material: "PLA".to_string(),
            color_name: "Black".to_string(),
            diameter_mm: 1.75,
        };
        assert!(store.find_product_by_key(&key).unwrap().is_some());

        // Case-sensitive by design: vendor-supplied case variance creates
        // a distinct identity.
        let lowercase = ProductKey {
            color_name: "black".to_string(),
            ..key.clone()
        };
        assert!(store.find_product_by_key(&lowercase).unwrap().is_none());

        let other_diameter = ProductKey {
            diameter_mm: 2.85,
            ..key
        };
        assert!(store.find_product_by_key(&other_diameter).unwrap().is_none());
    }

    #[test]
    fn spool_dates_roundtrip() {
        let store = InventoryStore::in_memory().unwrap();
        let product = store.insert_product(&sample_product()).unwrap();
        let spool = store
            .insert_spool(&SpoolInput {
                product_id: product.id,
                purchase_date: Some(date!(2025 - 02 - 16)),
                vendor: Some("Bambu Lab".to_string()),
                price: Some(19.99),
                storage_location: None,
                status: SpoolStatus::InStock,
            })
            .unwrap();
        assert_eq!(spool.purchase_date, Some(date!(2025 - 02 - 16)));
        assert_eq!(spool.status, SpoolStatus::InStock);

        let updated = store
            .update_spool(
                spool.id,
                &SpoolUpdate {
                    status: Some(SpoolStatus::UsedUp),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, SpoolStatus::UsedUp);
        assert_eq!(updated.purchase_date, Some(date!(2025 - 02 - 16)));
    }
}
