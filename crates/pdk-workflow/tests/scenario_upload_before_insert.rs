//! Scenario: call-order enforcement.
//!
//! # Invariant under test
//!
//! Confirming a submission always attempts the image upload before the
//! record insert — never the reverse, never concurrently — and the insert
//! references exactly the path the upload stored.

use std::sync::Mutex;

use pdk_schemas::{ImageFile, NewOrderRecord, OrderAck};
use pdk_workflow::{
    BackendResult, DetailsPatch, OrderBackend, OrderSession, SubmissionPipeline, UploadReceipt,
    UploadRequest, WorkflowState,
};

// ---------------------------------------------------------------------------
// Recording backend stub — captures the order and content of the two calls
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingBackend {
    calls: Mutex<Vec<String>>,
}

impl OrderBackend for RecordingBackend {
    fn upload_image(&self, req: UploadRequest) -> BackendResult<UploadReceipt> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("upload:{}", req.path));
        Ok(UploadReceipt { path: req.path })
    }

    fn create_order(&self, record: NewOrderRecord) -> BackendResult<OrderAck> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("insert:{}", record.image_path));
        Ok(OrderAck {
            order_id: "rec-1".to_string(),
            created_at: chrono::DateTime::UNIX_EPOCH,
        })
    }
}

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
fn upload_always_precedes_insert_with_matching_path() {
    let backend = RecordingBackend::default();
    let pipeline = SubmissionPipeline::new(&backend);

    let mut session = ready_session();
    let report = session.confirm_and_submit(&pipeline).unwrap();
    assert_eq!(report.state, WorkflowState::Succeeded);

    let calls = backend.calls.lock().unwrap();
    assert_eq!(calls.len(), 2, "exactly two backend calls, got: {calls:?}");
    let upload_path = calls[0]
        .strip_prefix("upload:")
        .expect("first call must be the upload");
    let insert_path = calls[1]
        .strip_prefix("insert:")
        .expect("second call must be the insert");
    assert_eq!(
        upload_path, insert_path,
        "the record must reference the uploaded path"
    );
    assert!(upload_path.ends_with(".png"));
}
