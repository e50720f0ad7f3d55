use serde::{Deserialize, Serialize};

/// Returned by the upload endpoint once the spreadsheet is staged and the
/// import job has been claimed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadAccepted {
    pub job_id: String,
    pub file_name: String,
    pub md5: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub national_id: String,
    pub id_serial: String,
    pub full_name: String,
    pub phone: String,
    pub registration_serial: String,
    pub registration_no: String,
    pub plate: String,
    pub brand: String,
    pub model: String,
    pub year: String,
    pub provider: String,
    pub price: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBankAccount {
    pub bank_name: String,
    pub iban: String,
    pub account_name: String,
    pub branch: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: i64,
}

fn default_active() -> bool {
    true
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BankAccountPatch {
    pub bank_name: Option<String>,
    pub iban: Option<String>,
    pub account_name: Option<String>,
    pub branch: Option<String>,
    pub is_active: Option<bool>,
    pub display_order: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCancelRequest {
    pub name: String,
    pub phone: String,
    pub plate: String,
}

/// Status change for orders and cancellation requests. `status` is checked
/// against the entity's status enum by the handler.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotesChange {
    #[serde(default)]
    pub notes: String,
}
