use super::{now_timestamp, Db, StoreError};
use common::model::cancel_request::{CancelRequest, CancelStatus};
use common::requests::NewCancelRequest;
use rusqlite::{params, OptionalExtension, Row};

const REQUEST_COLUMNS: &str = "id, name, phone, plate, status, notes, created_at";

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<CancelRequest> {
    let status: String = row.get(4)?;
    Ok(CancelRequest {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        plate: row.get(3)?,
        status: CancelStatus::parse(&status).unwrap_or(CancelStatus::Pending),
        notes: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl Db {
    pub fn insert_cancel_request(
        &self,
        request: &NewCancelRequest,
    ) -> Result<CancelRequest, StoreError> {
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO cancel_requests (name, phone, plate, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    request.name,
                    request.phone,
                    request.plate,
                    CancelStatus::Pending.as_str(),
                    now_timestamp(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        self.get_cancel_request(id)?
            .ok_or(StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_cancel_request(&self, id: i64) -> Result<Option<CancelRequest>, StoreError> {
        self.with_conn(|conn| {
            let request = conn
                .query_row(
                    &format!("SELECT {REQUEST_COLUMNS} FROM cancel_requests WHERE id = ?1"),
                    params![id],
                    request_from_row,
                )
                .optional()?;
            Ok(request)
        })
    }

    /// All requests, newest first.
    pub fn list_cancel_requests(&self) -> Result<Vec<CancelRequest>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REQUEST_COLUMNS} FROM cancel_requests ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt
                .query_map([], request_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Sets the status and, when given, replaces the notes.
    pub fn set_cancel_status(
        &self,
        id: i64,
        status: CancelStatus,
        notes: Option<&str>,
    ) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE cancel_requests SET status = ?1, notes = COALESCE(?2, notes) WHERE id = ?3",
                params![status.as_str(), notes, id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Replaces the notes; an empty string clears them.
    pub fn set_cancel_notes(&self, id: i64, notes: &str) -> Result<bool, StoreError> {
        let notes = if notes.trim().is_empty() { None } else { Some(notes) };
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE cancel_requests SET notes = ?1 WHERE id = ?2",
                params![notes, id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_cancel_request(&self, id: i64) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM cancel_requests WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> NewCancelRequest {
        NewCancelRequest {
            name: "Ece Demir".into(),
            phone: "05320000000".into(),
            plate: "35 XYZ 42".into(),
        }
    }

    #[test]
    fn status_change_keeps_notes_unless_replaced() {
        let db = Db::open_in_memory().unwrap();
        let created = db.insert_cancel_request(&request()).unwrap();
        assert_eq!(created.status, CancelStatus::Pending);
        assert!(created.notes.is_none());

        assert!(db.set_cancel_notes(created.id, "called back").unwrap());
        assert!(db.set_cancel_status(created.id, CancelStatus::Completed, None).unwrap());
        let done = db.get_cancel_request(created.id).unwrap().unwrap();
        assert_eq!(done.status, CancelStatus::Completed);
        assert_eq!(done.notes.as_deref(), Some("called back"));

        db.set_cancel_status(created.id, CancelStatus::Cancelled, Some("duplicate"))
            .unwrap();
        let cancelled = db.get_cancel_request(created.id).unwrap().unwrap();
        assert_eq!(cancelled.notes.as_deref(), Some("duplicate"));

        assert!(db.set_cancel_notes(created.id, "").unwrap());
        assert!(db.get_cancel_request(created.id).unwrap().unwrap().notes.is_none());
    }

    #[test]
    fn unknown_ids_report_false() {
        let db = Db::open_in_memory().unwrap();
        assert!(!db.set_cancel_status(7, CancelStatus::Completed, None).unwrap());
        assert!(!db.set_cancel_notes(7, "x").unwrap());
        assert!(!db.delete_cancel_request(7).unwrap());
    }
}
