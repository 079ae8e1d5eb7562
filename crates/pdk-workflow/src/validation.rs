//! Draft validation.
//!
//! Validation failures are reported before any event is applied: the state
//! machine never sees an invalid draft cross a guarded edge, and no remote
//! call is attempted for one.

use pdk_schemas::{ImageFile, Notice, OrderDraft};

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// Why a draft (or a selected file) was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// A file was selected whose MIME type is not `image/*`.
    NotAnImage,
    /// A file was selected with an empty body.
    EmptyImage,
    /// Submit attempted with no image on the draft.
    ImageRequired,
    /// Submit attempted with an empty name or phone.
    MissingContact,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            ValidationError::NotAnImage => "selected file is not an image",
            ValidationError::EmptyImage => "selected file is empty",
            ValidationError::ImageRequired => "image required",
            ValidationError::MissingContact => "name and phone are required",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    /// The user-facing notice for this rejection.
    pub fn notice(&self) -> Notice {
        match self {
            ValidationError::NotAnImage => {
                Notice::error("Unsupported file", "Please choose an image file")
            }
            ValidationError::EmptyImage => {
                Notice::error("Empty file", "The selected file has no content")
            }
            ValidationError::ImageRequired => {
                Notice::error("Image required", "Please upload your artwork")
            }
            ValidationError::MissingContact => Notice::error(
                "Required fields missing",
                "Please fill in your name and phone number",
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// Accept only non-empty files whose reported MIME type is `image/*`.
pub fn validate_image(file: &ImageFile) -> Result<(), ValidationError> {
    if !file.content_type.starts_with("image/") {
        return Err(ValidationError::NotAnImage);
    }
    if file.bytes.is_empty() {
        return Err(ValidationError::EmptyImage);
    }
    Ok(())
}

/// Full pre-submit check: image present and valid, name and phone non-empty.
///
/// Returns the image so callers can feed it straight into the upload without
/// re-matching the `Option`.
pub fn validate_draft(draft: &OrderDraft) -> Result<&ImageFile, ValidationError> {
    let image = draft.image.as_ref().ok_or(ValidationError::ImageRequired)?;
    validate_image(image)?;
    if draft.name.trim().is_empty() || draft.phone.trim().is_empty() {
        return Err(ValidationError::MissingContact);
    }
    Ok(image)
}

/// Empty or whitespace-only email is "not provided" and becomes NULL in the
/// order record.
pub fn normalize_email(email: &str) -> Option<String> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
