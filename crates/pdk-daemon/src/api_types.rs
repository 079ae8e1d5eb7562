//! Request and response types for all pdk-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded by
//! Axum and decoded by tests. No business logic lives here.

use pdk_schemas::Notice;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCreatedResponse {
    pub session_id: Uuid,
    pub state: String,
}

/// What the front end needs to render the form; image bytes stay server-side
/// (fetch them via the preview route).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftSummary {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub has_image: bool,
    pub image_file_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub state: String,
    pub draft: DraftSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailsRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

// ---------------------------------------------------------------------------
// Refusals
// ---------------------------------------------------------------------------

/// 422 body: the draft content was invalid; `notice` is what the front end
/// should toast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRejectedResponse {
    pub notice: Notice,
}

/// 409 body: the action is not legal in the session's current state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRefusedResponse {
    pub error: String,
}

/// 404 body for unknown sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotFoundResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmResponse {
    pub state: String,
    pub notice: Notice,
    /// Backend-assigned order id when the submission succeeded.
    pub order_id: Option<String>,
    /// Object-store path of the uploaded image when the submission succeeded.
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub state: String,
    /// Optional landing URL the front end may navigate to.
    pub redirect: Option<String>,
}
