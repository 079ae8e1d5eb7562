//! One customer's order session: the draft, its workflow state, and the
//! locally-held preview, driven by user actions and the submission pipeline.
//!
//! The session is the only writer of its draft, and every mutation goes
//! through a guarded state-machine edge first — a refused event leaves both
//! the state and the draft untouched.

use pdk_schemas::{ImageFile, Notice, OrderDraft};

use crate::backend::OrderBackend;
use crate::pipeline::{SubmissionOutcome, SubmissionPipeline, SubmitError};
use crate::state_machine::{apply, TransitionError, WorkflowEvent, WorkflowState};
use crate::validation::{validate_draft, validate_image, ValidationError};

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

/// A user action refused by the session: either the draft content is invalid
/// (validation — surfaces as a notice) or the action is not legal in the
/// current state (transition — a client sequencing bug).
#[derive(Debug)]
pub enum SessionError {
    Validation(ValidationError),
    Transition(TransitionError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Validation(v) => v.fmt(f),
            SessionError::Transition(t) => t.fmt(f),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<ValidationError> for SessionError {
    fn from(v: ValidationError) -> Self {
        SessionError::Validation(v)
    }
}

impl From<TransitionError> for SessionError {
    fn from(t: TransitionError) -> Self {
        SessionError::Transition(t)
    }
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

/// Local preview derived from the selected image — the served copy of what
/// the customer picked. Replaced when the image is replaced and dropped when
/// the session resets, so the bytes are not retained past their display.
#[derive(Debug, Clone)]
pub struct PreviewImage {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PreviewImage {
    fn derive(file: &ImageFile) -> Self {
        Self {
            content_type: file.content_type.clone(),
            bytes: file.bytes.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// DetailsPatch
// ---------------------------------------------------------------------------

/// Partial update of the contact fields; absent fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct DetailsPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

// ---------------------------------------------------------------------------
// SubmissionReport
// ---------------------------------------------------------------------------

/// What a confirm-and-submit run produced: the state the session landed in,
/// the notice to surface, and the outcome when the submission succeeded.
#[derive(Debug, Clone)]
pub struct SubmissionReport {
    pub state: WorkflowState,
    pub notice: Notice,
    pub outcome: Option<SubmissionOutcome>,
}

// ---------------------------------------------------------------------------
// OrderSession
// ---------------------------------------------------------------------------

/// One order draft and its workflow state.
#[derive(Debug, Default)]
pub struct OrderSession {
    state: WorkflowState,
    draft: OrderDraft,
    preview: Option<PreviewImage>,
    outcome: Option<SubmissionOutcome>,
}

impl OrderSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn draft(&self) -> &OrderDraft {
        &self.draft
    }

    pub fn preview(&self) -> Option<&PreviewImage> {
        self.preview.as_ref()
    }

    pub fn outcome(&self) -> Option<&SubmissionOutcome> {
        self.outcome.as_ref()
    }

    /// Supply (or replace) the image. Rejects non-image and empty files with
    /// no state change; on success the preview is re-derived and the old one
    /// released.
    pub fn select_image(&mut self, file: ImageFile) -> Result<(), SessionError> {
        validate_image(&file)?;
        self.state = apply(self.state, WorkflowEvent::ImageSelected)?;
        self.preview = Some(PreviewImage::derive(&file));
        self.draft.image = Some(file);
        Ok(())
    }

    /// Edit contact fields. No state change.
    pub fn edit_details(&mut self, patch: DetailsPatch) -> Result<(), SessionError> {
        self.state = apply(self.state, WorkflowEvent::DetailsEdited)?;
        if let Some(name) = patch.name {
            self.draft.name = name;
        }
        if let Some(phone) = patch.phone {
            self.draft.phone = phone;
        }
        if let Some(email) = patch.email {
            self.draft.email = email;
        }
        Ok(())
    }

    /// Submit attempt: full draft validation, then move to confirmation.
    pub fn request_submit(&mut self) -> Result<(), SessionError> {
        validate_draft(&self.draft)?;
        self.state = apply(self.state, WorkflowEvent::SubmitRequested)?;
        Ok(())
    }

    /// Back out of the confirmation step; the draft is untouched.
    pub fn cancel_confirmation(&mut self) -> Result<(), TransitionError> {
        self.state = apply(self.state, WorkflowEvent::ConfirmCancelled)?;
        Ok(())
    }

    /// Confirm and run the submission pipeline.
    ///
    /// Success lands in `Succeeded` with the confirmation notice. Any
    /// failure passes through `Failed` and settles in `AwaitingDetails`
    /// with the draft preserved and the failure notice in the report — a
    /// fresh submit re-attempts both calls from scratch.
    ///
    /// # Errors
    /// [`TransitionError`] when called outside `ConfirmPending` (including
    /// while a submission is already in flight).
    pub fn confirm_and_submit<B: OrderBackend>(
        &mut self,
        pipeline: &SubmissionPipeline<B>,
    ) -> Result<SubmissionReport, TransitionError> {
        self.state = apply(self.state, WorkflowEvent::Confirmed)?;

        match pipeline.submit(&self.draft) {
            Ok(outcome) => {
                self.state = apply(self.state, WorkflowEvent::SubmissionSucceeded)?;
                let notice = outcome.confirmation.clone();
                self.outcome = Some(outcome.clone());
                Ok(SubmissionReport {
                    state: self.state,
                    notice,
                    outcome: Some(outcome),
                })
            }
            Err(err) => {
                self.state = apply(self.state, WorkflowEvent::SubmissionFailed)?;
                let notice = err.notice();
                // Surfacing the notice is what clears the transient Failed
                // state; the draft survives for a retry.
                self.state = apply(self.state, WorkflowEvent::FailureReported)?;
                self.log_failure(&err);
                Ok(SubmissionReport {
                    state: self.state,
                    notice,
                    outcome: None,
                })
            }
        }
    }

    /// Acknowledge the success confirmation: clear the draft, release the
    /// preview, return to the initial state.
    pub fn acknowledge_success(&mut self) -> Result<(), TransitionError> {
        self.state = apply(self.state, WorkflowEvent::SuccessAcknowledged)?;
        self.draft = OrderDraft::default();
        self.preview = None;
        self.outcome = None;
        Ok(())
    }

    fn log_failure(&self, err: &SubmitError) {
        // Detail already logged at the pipeline; this records the session's
        // return to editing.
        tracing::info!(state = self.state.as_str(), error = %err, "submission failed; draft preserved");
    }
}
