use super::{now_timestamp, Db, StoreError};
use crate::ingest::NormalizedRecord;
use common::model::offer::OfferRecord;
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Row};
use std::collections::BTreeMap;

const OFFER_COLUMNS: &str = "id, brand, model, year, offers, created_at";

/// Identity column of the offer table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OfferField {
    Brand,
    Model,
    Year,
}

impl OfferField {
    fn column(&self) -> &'static str {
        match self {
            OfferField::Brand => "brand",
            OfferField::Model => "model",
            OfferField::Year => "year",
        }
    }
}

/// Equality filter on the identity columns; `None` matches anything.
#[derive(Clone, Debug, Default)]
pub struct OfferFilter {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
}

impl OfferFilter {
    fn where_clause(&self) -> (String, Vec<String>) {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        for (column, value) in [
            ("brand", &self.brand),
            ("model", &self.model),
            ("year", &self.year),
        ] {
            if let Some(value) = value {
                values.push(value.clone());
                clauses.push(format!("{} = ?{}", column, values.len()));
            }
        }
        if clauses.is_empty() {
            (String::new(), values)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), values)
        }
    }
}

fn offer_from_row(row: &Row<'_>) -> rusqlite::Result<OfferRecord> {
    let raw: String = row.get(4)?;
    let offers: BTreeMap<String, u64> = serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    Ok(OfferRecord {
        id: row.get(0)?,
        brand: row.get(1)?,
        model: row.get(2)?,
        year: row.get(3)?,
        offers,
        created_at: row.get(5)?,
    })
}

/// Escapes `LIKE` wildcards so the user's text matches literally.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

impl Db {
    /// Appends `records` in one transaction. Returns how many rows were written.
    pub fn insert_offers(&self, records: &[NormalizedRecord]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }
        self.with_conn(|conn| {
            let created_at = now_timestamp();
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO offers (brand, model, year, offers, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for record in records {
                    let offers = serde_json::to_string(&record.offers)?;
                    stmt.execute(params![
                        record.brand,
                        record.model,
                        record.year,
                        offers,
                        created_at
                    ])?;
                }
            }
            tx.commit()?;
            Ok(records.len())
        })
    }

    pub fn count_offers(&self) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM offers", [], |r| r.get(0))?;
            Ok(count as u64)
        })
    }

    /// Distinct values of `field` among records matching `filter`.
    /// Years sort newest first, everything else ascending.
    pub fn distinct_offer_values(
        &self,
        field: OfferField,
        filter: &OfferFilter,
    ) -> Result<Vec<String>, StoreError> {
        let (where_clause, values) = filter.where_clause();
        let order = match field {
            OfferField::Year => "DESC",
            _ => "ASC",
        };
        let sql = format!(
            "SELECT DISTINCT {col} FROM offers{where_clause} ORDER BY {col} {order}",
            col = field.column(),
        );
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn filter_offers(
        &self,
        filter: &OfferFilter,
        limit: Option<u32>,
    ) -> Result<Vec<OfferRecord>, StoreError> {
        let (where_clause, values) = filter.where_clause();
        let mut sql = format!("SELECT {OFFER_COLUMNS} FROM offers{where_clause} ORDER BY id");
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), offer_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Case-insensitive substring match on brand or model.
    pub fn search_offers(&self, query: &str, limit: u32) -> Result<Vec<OfferRecord>, StoreError> {
        let pattern = like_pattern(query);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {OFFER_COLUMNS} FROM offers \
                 WHERE brand LIKE ?1 ESCAPE '\\' OR model LIKE ?1 ESCAPE '\\' \
                 ORDER BY id LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(params![pattern, limit], offer_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// One page of records, newest first. `page` is 1-based.
    pub fn list_offers(&self, page: u32, per_page: u32) -> Result<Vec<OfferRecord>, StoreError> {
        let offset = u64::from(page.saturating_sub(1)) * u64::from(per_page);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {OFFER_COLUMNS} FROM offers ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2"
            ))?;
            let rows = stmt
                .query_map(params![per_page, offset as i64], offer_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_offer(&self, id: i64) -> Result<Option<OfferRecord>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {OFFER_COLUMNS} FROM offers WHERE id = ?1"))?;
            let mut rows = stmt.query_map(params![id], offer_from_row)?;
            Ok(rows.next().transpose()?)
        })
    }

    /// Provider names of the oldest stored record.
    pub fn provider_names(&self) -> Result<Vec<String>, StoreError> {
        let first = self.filter_offers(&OfferFilter::default(), Some(1))?;
        Ok(first
            .into_iter()
            .next()
            .map(|record| record.offers.into_keys().collect())
            .unwrap_or_default())
    }

    pub fn clear_offers(&self) -> Result<usize, StoreError> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM offers", [])?))
    }
}
