use super::{now_timestamp, Db, StoreError};
use common::model::bank_account::BankAccount;
use common::requests::{BankAccountPatch, NewBankAccount};
use rusqlite::{params, OptionalExtension, Row};

const ACCOUNT_COLUMNS: &str =
    "id, bank_name, iban, account_name, branch, is_active, display_order, created_at";

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<BankAccount> {
    Ok(BankAccount {
        id: row.get(0)?,
        bank_name: row.get(1)?,
        iban: row.get(2)?,
        account_name: row.get(3)?,
        branch: row.get(4)?,
        is_active: row.get(5)?,
        display_order: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl Db {
    /// Accounts ordered for display; `active_only` hides disabled ones.
    pub fn list_bank_accounts(&self, active_only: bool) -> Result<Vec<BankAccount>, StoreError> {
        let filter = if active_only { " WHERE is_active = 1" } else { "" };
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM bank_accounts{filter} ORDER BY display_order, id"
            ))?;
            let rows = stmt
                .query_map([], account_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_bank_account(&self, id: i64) -> Result<Option<BankAccount>, StoreError> {
        self.with_conn(|conn| {
            let account = conn
                .query_row(
                    &format!("SELECT {ACCOUNT_COLUMNS} FROM bank_accounts WHERE id = ?1"),
                    params![id],
                    account_from_row,
                )
                .optional()?;
            Ok(account)
        })
    }

    pub fn insert_bank_account(&self, account: &NewBankAccount) -> Result<BankAccount, StoreError> {
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO bank_accounts (bank_name, iban, account_name, branch, is_active, display_order, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    account.bank_name,
                    account.iban,
                    account.account_name,
                    account.branch,
                    account.is_active,
                    account.display_order,
                    now_timestamp(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        self.get_bank_account(id)?
            .ok_or(StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Applies the fields present in `patch`. `None` when the id is unknown.
    pub fn update_bank_account(
        &self,
        id: i64,
        patch: &BankAccountPatch,
    ) -> Result<Option<BankAccount>, StoreError> {
        let changed = self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE bank_accounts SET \
                 bank_name = COALESCE(?1, bank_name), \
                 iban = COALESCE(?2, iban), \
                 account_name = COALESCE(?3, account_name), \
                 branch = COALESCE(?4, branch), \
                 is_active = COALESCE(?5, is_active), \
                 display_order = COALESCE(?6, display_order) \
                 WHERE id = ?7",
                params![
                    patch.bank_name,
                    patch.iban,
                    patch.account_name,
                    patch.branch,
                    patch.is_active,
                    patch.display_order,
                    id,
                ],
            )?;
            Ok(changed)
        })?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_bank_account(id)
    }

    /// Flips `is_active` and returns the new value.
    pub fn toggle_bank_account(&self, id: i64) -> Result<Option<bool>, StoreError> {
        self.with_conn(|conn| {
            let active = conn
                .query_row(
                    "UPDATE bank_accounts SET is_active = 1 - is_active WHERE id = ?1 RETURNING is_active",
                    params![id],
                    |row| row.get::<_, bool>(0),
                )
                .optional()?;
            Ok(active)
        })
    }

    pub fn delete_bank_account(&self, id: i64) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM bank_accounts WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
    }
}
