use super::{now_timestamp, Db, StoreError};
use common::model::settings::SiteSettings;
use rusqlite::{params, OptionalExtension};

impl Db {
    pub fn site_settings(&self) -> Result<SiteSettings, StoreError> {
        self.with_conn(|conn| {
            let settings = conn
                .query_row(
                    "SELECT logo_path, updated_at FROM site_settings WHERE id = 1",
                    [],
                    |row| {
                        Ok(SiteSettings {
                            logo_path: row.get(0)?,
                            updated_at: row.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(settings.unwrap_or_default())
        })
    }

    /// Records the new logo file name (or none) and returns the previous one.
    pub fn replace_logo(&self, logo: Option<&str>) -> Result<Option<String>, StoreError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let previous: Option<String> = tx
                .query_row("SELECT logo_path FROM site_settings WHERE id = 1", [], |row| {
                    row.get(0)
                })
                .optional()?
                .flatten();
            tx.execute(
                "INSERT INTO site_settings (id, logo_path, updated_at) VALUES (1, ?1, ?2) \
                 ON CONFLICT(id) DO UPDATE SET logo_path = excluded.logo_path, updated_at = excluded.updated_at",
                params![logo, now_timestamp()],
            )?;
            tx.commit()?;
            Ok(previous)
        })
    }
}
