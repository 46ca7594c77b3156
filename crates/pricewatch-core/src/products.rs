use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Column order of the snapshot CSV consumed by the history merge.
pub const CSV_COLUMNS: [&str; 6] = ["sku", "name", "price", "availability", "stock", "url"];

/// Normalized stock status of a listing row.
///
/// Serializes to the exact labels the downstream history merge expects;
/// [`StockStatus::Unknown`] serializes as an empty string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockStatus {
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
    #[serde(rename = "Buy In Store")]
    BuyInStore,
    #[default]
    #[serde(rename = "")]
    Unknown,
}

impl StockStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StockStatus::InStock => "In Stock",
            StockStatus::OutOfStock => "Out of Stock",
            StockStatus::BuyInStore => "Buy In Store",
            StockStatus::Unknown => "",
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One product row scraped from a retailer listing page.
///
/// Field order matches [`CSV_COLUMNS`]; `availability_raw` is written to the
/// `availability` column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Retailer SKU, empty when the listing exposes none.
    pub sku: String,
    pub name: String,
    /// `"$12.34"` or empty when no price could be parsed.
    pub price: String,
    /// Retailer's own status phrase, e.g. `"In-Store Only"`.
    #[serde(rename = "availability")]
    pub availability_raw: String,
    pub stock: StockStatus,
    /// Absolute product detail URL, or empty.
    pub url: String,
}

impl ProductRecord {
    /// A row is usable only with a name and at least one identifier.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty() && (!self.sku.is_empty() || !self.url.is_empty())
    }
}

/// Drops later rows that repeat a non-empty SKU. Rows without a SKU are
/// always kept since there is no key to compare them on.
#[must_use]
pub fn dedupe_by_sku(records: Vec<ProductRecord>) -> Vec<ProductRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    records
        .into_iter()
        .filter(|r| r.sku.is_empty() || seen.insert(r.sku.clone()))
        .collect()
}
