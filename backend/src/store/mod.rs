//! SQLite persistence for the catalog.
//!
//! A single `Db` handle wraps one `rusqlite::Connection` behind a mutex and is
//! shared by the HTTP handlers (as `web::Data<Db>`) and by the import job,
//! which reaches it only through the [`OfferSink`] seam.
//!
//! The offer table is deliberately not unique on `(brand, model, year)`;
//! repeated imports append rows.

mod bank_accounts;
mod cancel_requests;
mod offers;
mod orders;
mod settings;

pub use offers::{OfferField, OfferFilter};

use crate::ingest::NormalizedRecord;
use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("stored offers are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not prepare database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("database connection lock poisoned")]
    Poisoned,
    #[error("{0} does not fit in an SQLite integer")]
    OutOfRange(&'static str),
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS offers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        brand TEXT NOT NULL,
        model TEXT NOT NULL,
        year TEXT NOT NULL,
        offers TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_offers_identity ON offers(brand, model, year);
    CREATE INDEX IF NOT EXISTS idx_offers_created ON offers(created_at);
    CREATE TABLE IF NOT EXISTS orders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        national_id TEXT NOT NULL,
        id_serial TEXT NOT NULL,
        full_name TEXT NOT NULL,
        phone TEXT NOT NULL,
        registration_serial TEXT NOT NULL,
        registration_no TEXT NOT NULL,
        plate TEXT NOT NULL,
        brand TEXT NOT NULL,
        model TEXT NOT NULL,
        year TEXT NOT NULL,
        provider TEXT NOT NULL,
        price INTEGER NOT NULL,
        payment_status TEXT NOT NULL DEFAULT 'pending',
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS bank_accounts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        bank_name TEXT NOT NULL,
        iban TEXT NOT NULL,
        account_name TEXT NOT NULL,
        branch TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        display_order INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS cancel_requests (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        phone TEXT NOT NULL,
        plate TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        notes TEXT,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS site_settings (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        logo_path TEXT,
        updated_at TEXT
    );
";

/// Shared handle to the catalog database.
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Db {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` with exclusive access to the connection.
    pub fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError>,
    {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&mut conn)
    }
}

/// Destination of normalised records during an import.
///
/// Each call is one batch and one transaction: either the whole slice is
/// stored or none of it is.
pub trait OfferSink: Send + Sync {
    fn bulk_insert(&self, records: &[NormalizedRecord]) -> Result<usize, StoreError>;
}

impl OfferSink for Db {
    fn bulk_insert(&self, records: &[NormalizedRecord]) -> Result<usize, StoreError> {
        self.insert_offers(records)
    }
}

/// Current time in the format every table uses for `created_at`.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_parent_directories_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("quotes.sqlite");
        Db::open(&path).unwrap();
        // Second open must tolerate the existing schema.
        let db = Db::open(&path).unwrap();
        assert_eq!(db.count_offers().unwrap(), 0);
    }

    #[test]
    fn timestamps_sort_chronologically_as_text() {
        let a = now_timestamp();
        let b = now_timestamp();
        assert!(a <= b);
        assert!(a.ends_with('Z'));
    }
}
