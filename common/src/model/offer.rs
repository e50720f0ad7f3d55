use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One stored vehicle with the prices each insurance provider quoted for it.
///
/// `(brand, model, year)` is a lookup tuple, not a key: importing the same
/// price list twice stores every row twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferRecord {
    pub id: i64,
    pub brand: String,
    pub model: String,
    /// Canonical integer text, e.g. `"2024"`.
    pub year: String,
    /// Provider name to positive whole price. Never empty for a stored record.
    pub offers: BTreeMap<String, u64>,
    /// RFC 3339 UTC, set when the record is written.
    pub created_at: String,
}

/// Aggregate figures shown on the catalog landing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total_records: u64,
    pub unique_brands: u64,
    pub providers: Vec<String>,
}
