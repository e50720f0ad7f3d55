//! Runtime configuration read from the environment (and `.env`, loaded in `main.rs`).

use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Batch sizes for the spreadsheet import pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IngestSettings {
    /// Rows handed from the reader to the normaliser at a time.
    pub read_batch_rows: usize,
    /// Records per bulk insert.
    pub write_batch_records: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        IngestSettings {
            read_batch_rows: 2_000,
            write_batch_records: 1_000,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub upload_dir: PathBuf,
    pub logo_dir: PathBuf,
    pub ingest: IngestSettings,
    pub max_upload_bytes: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Missing keys fall
    /// back to their defaults; present but unparsable keys are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = IngestSettings::default();
        let max_upload_mb = parse_positive(&lookup, "MAX_UPLOAD_MB", 50)?;
        let max_upload_bytes = max_upload_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| ConfigError::Invalid {
                key: "MAX_UPLOAD_MB",
                expected: "a size in megabytes that fits in 64 bits",
                value: max_upload_mb.to_string(),
            })?;

        Ok(AppConfig {
            host: lookup("APP_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: match lookup("APP_PORT") {
                Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    key: "APP_PORT",
                    expected: "a port number",
                    value: raw,
                })?,
                None => 8080,
            },
            database_path: lookup("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("quotes.sqlite")),
            upload_dir: lookup("UPLOAD_FOLDER")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            logo_dir: lookup("LOGO_FOLDER")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static/logos")),
            ingest: IngestSettings {
                read_batch_rows: parse_positive(
                    &lookup,
                    "INGEST_READ_BATCH",
                    defaults.read_batch_rows as u64,
                )? as usize,
                write_batch_records: parse_positive(
                    &lookup,
                    "INGEST_WRITE_BATCH",
                    defaults.write_batch_records as u64,
                )? as usize,
            },
            max_upload_bytes,
        })
    }
}

fn parse_positive<F>(lookup: &F, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(ConfigError::Invalid {
                key,
                expected: "a positive integer",
                value: raw,
            }),
        },
    }
}
