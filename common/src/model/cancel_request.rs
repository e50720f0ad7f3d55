use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelStatus {
    Pending,
    Completed,
    Cancelled,
}

impl CancelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelStatus::Pending => "pending",
            CancelStatus::Completed => "completed",
            CancelStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(CancelStatus::Pending),
            "completed" => Some(CancelStatus::Completed),
            "cancelled" => Some(CancelStatus::Cancelled),
            _ => None,
        }
    }
}

/// A customer asking for a policy to be cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub plate: String,
    pub status: CancelStatus,
    pub notes: Option<String>,
    pub created_at: String,
}
