use serde::{Deserialize, Serialize};

/// Site-wide settings. There is at most one row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteSettings {
    /// File name inside the logo folder, not a full path.
    pub logo_path: Option<String>,
    pub updated_at: Option<String>,
}
