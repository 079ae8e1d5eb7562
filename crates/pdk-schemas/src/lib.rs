use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An image file as received from the customer, before any upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageFile {
    /// Original client-side file name, e.g. "cat.png". Used only to
    /// preserve the extension when the storage path is generated.
    pub file_name: String,
    /// MIME type as reported by the client, e.g. "image/png".
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// In-progress order data held only on the client side of the backend.
///
/// Created empty when a workflow session starts, mutated field-by-field,
/// discarded on success acknowledgment or session teardown.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderDraft {
    pub name: String,
    pub phone: String,
    /// Optional; empty string means "not provided".
    pub email: String,
    pub image: Option<ImageFile>,
}

/// The row written to the backend's order table on successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderRecord {
    pub name: String,
    pub phone: String,
    /// `None` serializes as JSON null — the record store column is nullable.
    pub email: Option<String>,
    pub image_path: String,
}

/// Backend acknowledgment for a created order record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    /// Backend-assigned record identity.
    pub order_id: String,
    pub created_at: DateTime<Utc>,
}

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Error,
}

/// A user-facing notification: validation errors, backend failures, and the
/// success confirmation all surface through this shape. Backend error detail
/// never appears here — it goes to the log only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notice {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Info,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Error,
        }
    }
}
