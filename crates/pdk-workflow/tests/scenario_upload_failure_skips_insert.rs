//! Scenario: backend failure handling.
//!
//! # Invariants under test
//!
//! - If the upload fails, the record insert is never attempted; the session
//!   passes through `Failed` and settles in `AwaitingDetails` with the draft
//!   preserved and only a generic retry-later notice surfaced.
//! - If the insert fails after a successful upload, the uploaded object is
//!   left orphaned (no compensating delete) and a retried submit re-runs
//!   both calls with a freshly generated path.

use pdk_backend_memory::MemoryBackend;
use pdk_schemas::{ImageFile, Severity};
use pdk_workflow::{DetailsPatch, OrderSession, SubmissionPipeline, WorkflowState};

fn ready_session() -> OrderSession {
    let mut session = OrderSession::new();
    session
        .select_image(ImageFile {
            file_name: "cat.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: b"png".to_vec(),
        })
        .unwrap();
    session
        .edit_details(DetailsPatch {
            name: Some("Alice".to_string()),
            phone: Some("555-1234".to_string()),
            ..Default::default()
        })
        .unwrap();
    session.request_submit().unwrap();
    session
}

#[test]
fn upload_failure_skips_insert_and_returns_to_details() {
    let backend = MemoryBackend::new();
    backend.set_fail_uploads(true);
    let pipeline = SubmissionPipeline::new(&backend);

    let mut session = ready_session();
    let report = session.confirm_and_submit(&pipeline).unwrap();

    // Control returned to editing; draft intact for a manual retry.
    assert_eq!(report.state, WorkflowState::AwaitingDetails);
    assert_eq!(session.state(), WorkflowState::AwaitingDetails);
    assert_eq!(session.draft().name, "Alice");
    assert!(session.draft().image.is_some());

    // The record store was never touched.
    assert_eq!(backend.order_count(), 0);
    assert!(backend.object_paths().is_empty());

    // Only the generic message is surfaced — no backend detail.
    assert_eq!(report.notice.severity, Severity::Error);
    assert_eq!(report.notice.title, "Error submitting order");
    assert_eq!(report.notice.description, "Please try again later");
    assert!(!report.notice.description.contains("injected"));
    assert!(report.outcome.is_none());
}

#[test]
fn insert_failure_leaves_orphan_and_retry_uses_fresh_path() {
    let backend = MemoryBackend::new();
    backend.set_fail_inserts(true);
    let pipeline = SubmissionPipeline::new(&backend);

    let mut session = ready_session();
    let report = session.confirm_and_submit(&pipeline).unwrap();
    assert_eq!(report.state, WorkflowState::AwaitingDetails);

    // Upload succeeded before the insert failed: one orphaned object.
    let orphaned = backend.object_paths();
    assert_eq!(orphaned.len(), 1);
    assert_eq!(backend.order_count(), 0);

    // Manual retry: both calls re-run from scratch under a new path.
    backend.set_fail_inserts(false);
    session.request_submit().unwrap();
    let report = session.confirm_and_submit(&pipeline).unwrap();
    assert_eq!(report.state, WorkflowState::Succeeded);

    let paths = backend.object_paths();
    assert_eq!(paths.len(), 2, "orphan remains alongside the fresh upload");
    assert_ne!(paths[0], paths[1]);

    let orders = backend.orders();
    assert_eq!(orders.len(), 1);
    assert!(
        !orders[0].1.image_path.is_empty() && orders[0].1.image_path != orphaned[0],
        "the record references the fresh path, not the orphan"
    );
}
