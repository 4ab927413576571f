//! Wire types and paths shared by the server and the save client.

use serde::{Deserialize, Serialize};

/// Read endpoint; doubles as the liveness probe.
pub const DATA_PATH: &str = "/api/data";

/// Write endpoint.
pub const SAVE_PATH: &str = "/api/save";

/// Editor page path, relative to the server root.
pub const ADMIN_PAGE: &str = "/admin.html";

/// Body returned by the save endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveResponse {
    /// Whether the document was written.
    pub success: bool,
    /// Human-readable confirmation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Why the save failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Document total as written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    /// RFC 3339 timestamp of the write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
}

impl SaveResponse {
    /// A successful save.
    #[must_use]
    pub fn saved(total: f64, saved_at: String) -> Self {
        Self {
            success: true,
            message: Some("Data saved successfully".to_string()),
            error: None,
            total: Some(total),
            saved_at: Some(saved_at),
        }
    }

    /// A failed save.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
            total: None,
            saved_at: None,
        }
    }
}

/// Body returned when the data file is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// What went wrong.
    pub error: String,
}
