//! Submission pipeline — the single choke-point for backend calls.
//!
//! # Invariants
//!
//! 1. **Validation first.** An invalid draft produces no remote call.
//! 2. **Upload before insert.** `create_order` runs only after
//!    `upload_image` returned a receipt; a failed upload means the record
//!    store is never touched.
//! 3. **Generic surface, detailed log.** Backend failures reach the user as
//!    a "try again later" notice only; status/body detail goes to the log.
//!
//! Partial failure (upload ok, insert failed) leaves an orphaned object in
//! the store. There is no compensating delete — the path is logged at
//! `warn!` so the bucket can be swept. A retried submit regenerates the
//! object path and re-uploads from scratch.

use pdk_schemas::{NewOrderRecord, Notice, OrderAck, OrderDraft};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::backend::{OrderBackend, UploadRequest};
use crate::validation::{normalize_email, validate_draft, ValidationError};

// ---------------------------------------------------------------------------
// Object path generation
// ---------------------------------------------------------------------------

/// Generate a storage path that cannot collide with concurrent submissions:
/// a random UUID v4 token, keeping the original file's extension so the
/// stored object stays recognizable.
///
/// Collisions are not otherwise checked.
pub fn generate_object_path(original_file_name: &str) -> String {
    let token = Uuid::new_v4();
    match original_file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => format!("{token}.{ext}"),
        _ => token.to_string(),
    }
}

// ---------------------------------------------------------------------------
// SubmitError
// ---------------------------------------------------------------------------

/// Why a submission failed. Validation means no call was made; the two
/// backend variants identify which call failed (the other was not attempted
/// or had already succeeded).
#[derive(Debug)]
pub enum SubmitError {
    Validation(ValidationError),
    Upload(Box<dyn std::error::Error + Send + Sync>),
    Insert {
        /// Object path that is now orphaned in the store.
        image_path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::Validation(v) => write!(f, "validation failed: {v}"),
            SubmitError::Upload(e) => write!(f, "image upload failed: {e}"),
            SubmitError::Insert { source, .. } => write!(f, "order insert failed: {source}"),
        }
    }
}

impl std::error::Error for SubmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SubmitError::Validation(v) => Some(v),
            SubmitError::Upload(e) => Some(e.as_ref()),
            SubmitError::Insert { source, .. } => Some(source.as_ref()),
        }
    }
}

impl SubmitError {
    /// The user-facing notice for this failure. Backend detail is withheld.
    pub fn notice(&self) -> Notice {
        match self {
            SubmitError::Validation(v) => v.notice(),
            SubmitError::Upload(_) | SubmitError::Insert { .. } => {
                Notice::error("Error submitting order", "Please try again later")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SubmissionOutcome / SubmissionPipeline
// ---------------------------------------------------------------------------

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub ack: OrderAck,
    /// Where the image ended up in the object store.
    pub image_path: String,
    /// Confirmation notice referencing the submitted phone number.
    pub confirmation: Notice,
}

/// Runs the two backend calls for one draft, in order, at most once per
/// invocation. Stateless — the caller owns the workflow state.
pub struct SubmissionPipeline<B: OrderBackend> {
    backend: B,
}

impl<B: OrderBackend> SubmissionPipeline<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Validate, upload, insert.
    ///
    /// # Errors
    /// [`SubmitError::Validation`] before any call; [`SubmitError::Upload`]
    /// when the blob store refused (record store untouched);
    /// [`SubmitError::Insert`] when the row insert failed after a successful
    /// upload (orphaned object logged).
    pub fn submit(&self, draft: &OrderDraft) -> Result<SubmissionOutcome, SubmitError> {
        let image = validate_draft(draft).map_err(SubmitError::Validation)?;

        let path = generate_object_path(&image.file_name);
        let receipt = self
            .backend
            .upload_image(UploadRequest {
                path: path.clone(),
                content_type: image.content_type.clone(),
                bytes: image.bytes.clone(),
            })
            .map_err(|e| {
                error!(path = %path, error = %e, "image upload failed");
                SubmitError::Upload(e)
            })?;

        let record = NewOrderRecord {
            name: draft.name.clone(),
            phone: draft.phone.clone(),
            email: normalize_email(&draft.email),
            image_path: receipt.path.clone(),
        };

        let ack = self.backend.create_order(record).map_err(|e| {
            error!(image_path = %receipt.path, error = %e, "order insert failed");
            warn!(image_path = %receipt.path, "orphaned object left in store (no compensating delete)");
            SubmitError::Insert {
                image_path: receipt.path.clone(),
                source: e,
            }
        })?;

        info!(order_id = %ack.order_id, image_path = %receipt.path, "order submitted");

        Ok(SubmissionOutcome {
            confirmation: confirmation_notice(&draft.phone),
            image_path: receipt.path,
            ack,
        })
    }
}

/// Success confirmation shown (and spoken back over the notice channel)
/// after both calls resolve.
fn confirmation_notice(phone: &str) -> Notice {
    Notice::info(
        "Order submitted successfully!",
        format!(
            "Thank you for your order. Our team will contact you at the \
             provided phone number: {phone}"
        ),
    )
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_path_preserves_extension() {
        let p = generate_object_path("cat.png");
        assert!(p.ends_with(".png"), "got: {p}");
        // token + "." + "png"
        assert!(p.len() > ".png".len());
    }

    #[test]
    fn object_path_without_extension_is_bare_token() {
        let p = generate_object_path("artwork");
        assert!(!p.contains('.'), "got: {p}");
    }

    #[test]
    fn dotfile_has_no_usable_extension() {
        // ".png" has an empty stem; treat it as extension-less.
        let p = generate_object_path(".png");
        assert!(!p.contains('.'), "got: {p}");
    }

    #[test]
    fn object_paths_are_unique() {
        let a = generate_object_path("cat.png");
        let b = generate_object_path("cat.png");
        assert_ne!(a, b);
    }

    #[test]
    fn confirmation_references_phone() {
        let n = confirmation_notice("555-1234");
        assert!(n.description.contains("555-1234"));
    }
}
