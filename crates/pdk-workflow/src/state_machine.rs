//! Submission workflow state machine.
//!
//! # Design
//!
//! One enumerated state per phase of the order form, and a guarded
//! transition function: every state/event pair is either a defined
//! transition or a [`TransitionError`]. There are no boolean/step flags, so
//! invalid combinations ("submitting" while not in `Submitting`) cannot be
//! represented.
//!
//! # State diagram
//!
//! ```text
//!   new()                ImageSelected
//!   ──────► AwaitingImage ───────────► AwaitingDetails ◄──┐
//!                                        │      ▲         │
//!                         SubmitRequested│      │Cancelled │FailureReported
//!                                        ▼      │          │
//!                                   ConfirmPending         │
//!                                        │Confirmed        │
//!                                        ▼                 │
//!                                    Submitting ──────► Failed
//!                                        │ SubmissionFailed
//!                                        │ SubmissionSucceeded
//!                                        ▼
//!                                    Succeeded ── SuccessAcknowledged ──► AwaitingImage
//! ```
//!
//! `ImageSelected` is also legal from `AwaitingDetails` (replacing the
//! image before submit). Validation (image MIME type, required fields) is
//! NOT part of this table — it happens before the corresponding event is
//! applied, and a validation failure applies no event at all.

// ---------------------------------------------------------------------------
// WorkflowState
// ---------------------------------------------------------------------------

/// All valid states of one order submission workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowState {
    /// No image yet; the form shows the upload prompt.
    AwaitingImage,
    /// Image held; contact fields are editable.
    AwaitingDetails,
    /// Draft validated; waiting for the customer to confirm or cancel.
    ConfirmPending,
    /// Both backend calls are in flight; further submit triggers refused.
    Submitting,
    /// Both calls succeeded; confirmation shown until acknowledged.
    Succeeded,
    /// A backend call failed; cleared back to `AwaitingDetails` once the
    /// failure notice has been surfaced.
    Failed,
}

impl Default for WorkflowState {
    fn default() -> Self {
        WorkflowState::AwaitingImage
    }
}

impl WorkflowState {
    /// Wire-level name, used by the HTTP surface and in error strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::AwaitingImage => "awaiting_image",
            WorkflowState::AwaitingDetails => "awaiting_details",
            WorkflowState::ConfirmPending => "confirm_pending",
            WorkflowState::Submitting => "submitting",
            WorkflowState::Succeeded => "succeeded",
            WorkflowState::Failed => "failed",
        }
    }

    /// Returns `true` while a submission is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, WorkflowState::Submitting)
    }
}

// ---------------------------------------------------------------------------
// WorkflowEvent
// ---------------------------------------------------------------------------

/// Events that drive state transitions. Payloads (the image file, field
/// values) travel through [`crate::OrderSession`] methods, not through the
/// event — the table below is purely about legality of transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowEvent {
    /// A valid image was supplied (initial selection or replacement).
    ImageSelected,
    /// A contact field was edited. Identity transition.
    DetailsEdited,
    /// Submit attempt passed validation.
    SubmitRequested,
    /// Customer backed out of the confirmation step.
    ConfirmCancelled,
    /// Customer confirmed; backend calls may begin.
    Confirmed,
    /// Upload and record-create both succeeded.
    SubmissionSucceeded,
    /// Upload or record-create failed.
    SubmissionFailed,
    /// The failure notice was surfaced; editing resumes, draft intact.
    FailureReported,
    /// The success confirmation was acknowledged; the workflow resets.
    SuccessAcknowledged,
}

// ---------------------------------------------------------------------------
// TransitionError
// ---------------------------------------------------------------------------

/// Returned when an event cannot legally be applied in the current state.
///
/// The draft and state are left untouched when this is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    /// The state the workflow was in when the illegal event arrived.
    pub from: WorkflowState,
    /// The event that was refused.
    pub event: WorkflowEvent,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "illegal workflow transition: {} + {:?}",
            self.from.as_str(),
            self.event
        )
    }
}

impl std::error::Error for TransitionError {}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// Apply `event` to `state`, returning the next state.
///
/// # Errors
/// Returns [`TransitionError`] for any state/event pair not in the table.
pub fn apply(state: WorkflowState, event: WorkflowEvent) -> Result<WorkflowState, TransitionError> {
    use WorkflowEvent::*;
    use WorkflowState::*;

    let next = match (state, event) {
        // Image selection: first time, or replacement before submit.
        (AwaitingImage | AwaitingDetails, ImageSelected) => AwaitingDetails,

        // Field edits never change state.
        (AwaitingDetails, DetailsEdited) => AwaitingDetails,

        // Submit attempt (validation already passed).
        (AwaitingDetails, SubmitRequested) => ConfirmPending,

        // Confirmation step.
        (ConfirmPending, ConfirmCancelled) => AwaitingDetails,
        (ConfirmPending, Confirmed) => Submitting,

        // Backend resolution.
        (Submitting, SubmissionSucceeded) => Succeeded,
        (Submitting, SubmissionFailed) => Failed,

        // Failure is transient: once the notice is out, editing resumes.
        (Failed, FailureReported) => AwaitingDetails,

        // Success acknowledgment resets the whole workflow.
        (Succeeded, SuccessAcknowledged) => AwaitingImage,

        // Everything else is illegal.
        (state, event) => return Err(TransitionError { from: state, event }),
    };

    Ok(next)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
