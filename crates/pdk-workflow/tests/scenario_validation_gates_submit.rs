//! Scenario: validation gates.
//!
//! # Invariants under test
//!
//! - A non-image file keeps the session in `AwaitingImage` with a
//!   validation notice; no draft mutation happens.
//! - A submit attempt with no image reports "Image required" and changes
//!   nothing.
//! - A draft missing name or phone never reaches `ConfirmPending`.
//! - No validation failure ever reaches the backend.

use pdk_backend_memory::MemoryBackend;
use pdk_schemas::ImageFile;
use pdk_workflow::{
    DetailsPatch, OrderSession, SessionError, ValidationError, WorkflowState,
};

fn file(name: &str, content_type: &str, bytes: &[u8]) -> ImageFile {
    ImageFile {
        file_name: name.to_string(),
        content_type: content_type.to_string(),
        bytes: bytes.to_vec(),
    }
}

#[test]
fn non_image_file_is_rejected_in_place() {
    let mut session = OrderSession::new();

    let err = session
        .select_image(file("doc.pdf", "application/pdf", b"%PDF"))
        .unwrap_err();
    match err {
        SessionError::Validation(v) => assert_eq!(v, ValidationError::NotAnImage),
        other => panic!("expected validation error, got {other:?}"),
    }

    assert_eq!(session.state(), WorkflowState::AwaitingImage);
    assert!(session.draft().image.is_none());
    assert!(session.preview().is_none());
}

#[test]
fn empty_file_is_rejected_in_place() {
    let mut session = OrderSession::new();
    let err = session
        .select_image(file("blank.png", "image/png", b""))
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Validation(ValidationError::EmptyImage)
    ));
    assert_eq!(session.state(), WorkflowState::AwaitingImage);
}

#[test]
fn submit_without_image_reports_image_required() {
    let mut session = OrderSession::new();

    let err = session.request_submit().unwrap_err();
    match err {
        SessionError::Validation(v) => {
            assert_eq!(v, ValidationError::ImageRequired);
            assert_eq!(v.notice().title, "Image required");
            assert_eq!(v.notice().description, "Please upload your artwork");
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(session.state(), WorkflowState::AwaitingImage);
}

#[test]
fn missing_contact_never_reaches_confirm_pending() {
    let mut session = OrderSession::new();
    session
        .select_image(file("cat.png", "image/png", b"png"))
        .unwrap();

    // Name set, phone still empty.
    session
        .edit_details(DetailsPatch {
            name: Some("Alice".to_string()),
            ..Default::default()
        })
        .unwrap();

    let err = session.request_submit().unwrap_err();
    match err {
        SessionError::Validation(v) => {
            assert_eq!(v, ValidationError::MissingContact);
            assert_eq!(v.notice().title, "Required fields missing");
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(session.state(), WorkflowState::AwaitingDetails);
}

#[test]
fn validation_failures_never_touch_the_backend() {
    let backend = MemoryBackend::new();
    let pipeline = pdk_workflow::SubmissionPipeline::new(&backend);

    let mut session = OrderSession::new();
    assert!(session.request_submit().is_err());
    // Confirm without ever reaching ConfirmPending is a transition error.
    assert!(session.confirm_and_submit(&pipeline).is_err());

    assert!(backend.object_paths().is_empty());
    assert_eq!(backend.order_count(), 0);
}
