use serde::{Deserialize, Serialize};

/// Manually toggled label; no payment is processed by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

/// A customer's request to buy one of the quoted offers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
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
    pub payment_status: PaymentStatus,
    pub created_at: String,
}
