use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: i64,
    pub bank_name: String,
    pub iban: String,
    pub account_name: String,
    pub branch: String,
    pub is_active: bool,
    /// Position in the customer-facing list, ascending.
    pub display_order: i64,
    pub created_at: String,
}
