//! Scenario: end-to-end submission over the HTTP surface.
//!
//! # Invariants under test
//!
//! - The full happy path walks create → image → details → submit → confirm
//!   → ack, lands the order in the backend, and the confirmation notice
//!   references the submitted phone number.
//! - A backend failure surfaces only the generic retry-later notice and
//!   returns the session to `awaiting_details` with the draft intact.
//! - The preview is served while held and is gone after acknowledgment.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use pdk_backend_memory::MemoryBackend;
use pdk_daemon::{routes, state};
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// AppState plus a concrete handle to the memory backend for assertions and
/// failure injection.
fn make_state_with_backend(landing_url: Option<String>) -> (Arc<state::AppState>, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    let st = Arc::new(state::AppState::new(
        Arc::clone(&backend) as Arc<dyn pdk_workflow::OrderBackend>,
        landing_url,
    ));
    (st, backend)
}

async fn call(
    st: &Arc<state::AppState>,
    req: Request<axum::body::Body>,
) -> (StatusCode, bytes::Bytes) {
    let router = routes::build_router(Arc::clone(st));
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

fn post_empty(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

/// Walk a session up to `confirm_pending`; returns the session id.
async fn ready_session(st: &Arc<state::AppState>) -> String {
    let (_, body) = call(st, post_empty("/v1/session")).await;
    let id = parse_json(body)["session_id"].as_str().unwrap().to_string();

    let image = Request::builder()
        .method("POST")
        .uri(format!("/v1/session/{id}/image"))
        .header("content-type", "image/png")
        .header("x-file-name", "cat.png")
        .body(axum::body::Body::from(b"\x89PNG-fake".to_vec()))
        .unwrap();
    let (status, _) = call(st, image).await;
    assert_eq!(status, StatusCode::OK);

    let details = Request::builder()
        .method("POST")
        .uri(format!("/v1/session/{id}/details"))
        .header("content-type", "application/json")
        .body(axum::body::Body::from(
            serde_json::json!({"name": "Alice", "phone": "555-1234", "email": ""}).to_string(),
        ))
        .unwrap();
    let (status, _) = call(st, details).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(st, post_empty(&format!("/v1/session/{id}/submit"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)["state"], "confirm_pending");

    id
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn full_submission_happy_path() {
    let (st, backend) =
        make_state_with_backend(Some("https://prints.example.com/thanks".to_string()));
    let id = ready_session(&st).await;

    let (status, body) = call(&st, post_empty(&format!("/v1/session/{id}/confirm"))).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["state"], "succeeded");
    assert_eq!(json["order_id"], "mem-order-1");
    assert!(json["notice"]["description"]
        .as_str()
        .unwrap()
        .contains("555-1234"));

    // Backend holds the object and the record, linked by path.
    let paths = backend.object_paths();
    assert_eq!(paths.len(), 1);
    assert!(paths[0].ends_with(".png"));
    assert_eq!(json["image_path"], paths[0].as_str());

    let orders = backend.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].1.name, "Alice");
    assert_eq!(orders[0].1.email, None, "empty email stored as null");
    assert_eq!(orders[0].1.image_path, paths[0]);

    // Acknowledgment resets the session and hands back the landing redirect.
    let (status, body) = call(&st, post_empty(&format!("/v1/session/{id}/ack"))).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["state"], "awaiting_image");
    assert_eq!(json["redirect"], "https://prints.example.com/thanks");

    let (_, body) = call(&st, get(&format!("/v1/session/{id}"))).await;
    let json = parse_json(body);
    assert_eq!(json["draft"]["has_image"], false, "draft cleared on ack");
}

// ---------------------------------------------------------------------------
// Backend failure
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn backend_failure_returns_to_details_with_generic_notice() {
    let (st, backend) = make_state_with_backend(None);
    backend.set_fail_uploads(true);
    let id = ready_session(&st).await;

    let (status, body) = call(&st, post_empty(&format!("/v1/session/{id}/confirm"))).await;
    assert_eq!(status, StatusCode::OK, "a failed submission is not an HTTP error");

    let json = parse_json(body);
    assert_eq!(json["state"], "awaiting_details");
    assert_eq!(json["notice"]["title"], "Error submitting order");
    assert_eq!(json["notice"]["description"], "Please try again later");
    assert!(json["order_id"].is_null());

    // Nothing was persisted; the draft survived for a retry.
    assert_eq!(backend.order_count(), 0);
    let (_, body) = call(&st, get(&format!("/v1/session/{id}"))).await;
    let json = parse_json(body);
    assert_eq!(json["draft"]["name"], "Alice");
    assert_eq!(json["draft"]["has_image"], true);

    // Manual retry after the backend recovers succeeds.
    backend.set_fail_uploads(false);
    let (status, _) = call(&st, post_empty(&format!("/v1/session/{id}/submit"))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(&st, post_empty(&format!("/v1/session/{id}/confirm"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)["state"], "succeeded");
    assert_eq!(backend.order_count(), 1);
}

// ---------------------------------------------------------------------------
// Preview lifecycle
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn preview_served_while_held_and_released_after_ack() {
    let (st, _backend) = make_state_with_backend(None);
    let id = ready_session(&st).await;

    let router = routes::build_router(Arc::clone(&st));
    let resp = router
        .oneshot(get(&format!("/v1/session/{id}/preview")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "image/png"
    );
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"\x89PNG-fake");

    // Finish the order; the preview must be released with the draft.
    call(&st, post_empty(&format!("/v1/session/{id}/confirm"))).await;
    call(&st, post_empty(&format!("/v1/session/{id}/ack"))).await;

    let (status, _) = call(&st, get(&format!("/v1/session/{id}/preview"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
