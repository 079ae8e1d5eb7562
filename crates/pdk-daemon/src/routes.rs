//! Axum router and all HTTP handlers for pdk-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.
//!
//! One workflow session per order draft, keyed by UUID. Refusal mapping:
//! unknown session → 404, invalid draft content → 422 with the notice to
//! toast, action illegal in the current state → 409 with the transition
//! error string.

use std::{convert::Infallible, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use pdk_schemas::ImageFile;
use pdk_workflow::{DetailsPatch, OrderSession, SessionError, SubmissionPipeline};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;
use uuid::Uuid;

use crate::{
    api_types::{
        AckResponse, ConfirmResponse, DraftSummary, HealthResponse, NotFoundResponse,
        SessionCreatedResponse, SessionSnapshot, TransitionRefusedResponse,
        ValidationRejectedResponse,
    },
    state::{AppState, BusMsg},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/session", post(session_create))
        .route("/v1/session/:id", get(session_get))
        .route("/v1/session/:id/image", post(session_image))
        .route("/v1/session/:id/preview", get(session_preview))
        .route("/v1/session/:id/details", post(session_details))
        .route("/v1/session/:id/submit", post(session_submit))
        .route("/v1/session/:id/cancel", post(session_cancel))
        .route("/v1/session/:id/confirm", post(session_confirm))
        .route("/v1/session/:id/ack", post(session_ack))
        .route("/v1/stream", get(stream))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn snapshot(session_id: Uuid, session: &OrderSession) -> SessionSnapshot {
    let draft = session.draft();
    SessionSnapshot {
        session_id,
        state: session.state().as_str().to_string(),
        draft: DraftSummary {
            name: draft.name.clone(),
            phone: draft.phone.clone(),
            email: draft.email.clone(),
            has_image: draft.image.is_some(),
            image_file_name: draft.image.as_ref().map(|i| i.file_name.clone()),
        },
    }
}

fn session_not_found(id: Uuid) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundResponse {
            error: format!("unknown session: {id}"),
        }),
    )
        .into_response()
}

/// Map a refused session action to its HTTP shape, pushing validation
/// notices onto the toast bus on the way out.
fn refuse(st: &AppState, err: SessionError) -> Response {
    match err {
        SessionError::Validation(v) => {
            let notice = v.notice();
            st.publish_notice(&notice);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ValidationRejectedResponse { notice }),
            )
                .into_response()
        }
        SessionError::Transition(t) => (
            StatusCode::CONFLICT,
            Json(TransitionRefusedResponse {
                error: t.to_string(),
            }),
        )
            .into_response(),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// POST /v1/session
// ---------------------------------------------------------------------------

pub(crate) async fn session_create(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let session_id = Uuid::new_v4();
    let session = OrderSession::new();
    let state_name = session.state().as_str().to_string();

    st.sessions.write().await.insert(session_id, session);

    info!(%session_id, "session created");
    st.publish_session_state(session_id, &state_name);
    (
        StatusCode::OK,
        Json(SessionCreatedResponse {
            session_id,
            state: state_name,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/session/{id}
// ---------------------------------------------------------------------------

pub(crate) async fn session_get(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    let sessions = st.sessions.read().await;
    match sessions.get(&id) {
        Some(session) => (StatusCode::OK, Json(snapshot(id, session))).into_response(),
        None => session_not_found(id),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/session/{id}/image
// ---------------------------------------------------------------------------

/// Raw upload: body is the file bytes, `Content-Type` is the client-reported
/// MIME type, `x-file-name` carries the original name (for the extension).
pub(crate) async fn session_image(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let file_name = headers
        .get("x-file-name")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("upload")
        .to_string();

    let mut sessions = st.sessions.write().await;
    let Some(session) = sessions.get_mut(&id) else {
        return session_not_found(id);
    };

    let file = ImageFile {
        file_name,
        content_type,
        bytes: body.to_vec(),
    };
    match session.select_image(file) {
        Ok(()) => {
            info!(session_id = %id, state = session.state().as_str(), "image selected");
            st.publish_session_state(id, session.state().as_str());
            (StatusCode::OK, Json(snapshot(id, session))).into_response()
        }
        Err(err) => refuse(&st, err),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/session/{id}/preview
// ---------------------------------------------------------------------------

pub(crate) async fn session_preview(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    let sessions = st.sessions.read().await;
    let Some(session) = sessions.get(&id) else {
        return session_not_found(id);
    };

    match session.preview() {
        Some(preview) => {
            let ct = HeaderValue::from_str(&preview.content_type)
                .unwrap_or(HeaderValue::from_static("application/octet-stream"));
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, ct)],
                preview.bytes.clone(),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(NotFoundResponse {
                error: "no preview held for this session".to_string(),
            }),
        )
            .into_response(),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/session/{id}/details
// ---------------------------------------------------------------------------

pub(crate) async fn session_details(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<crate::api_types::DetailsRequest>,
) -> Response {
    let mut sessions = st.sessions.write().await;
    let Some(session) = sessions.get_mut(&id) else {
        return session_not_found(id);
    };

    let patch = DetailsPatch {
        name: req.name,
        phone: req.phone,
        email: req.email,
    };
    match session.edit_details(patch) {
        Ok(()) => (StatusCode::OK, Json(snapshot(id, session))).into_response(),
        Err(err) => refuse(&st, err),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/session/{id}/submit
// ---------------------------------------------------------------------------

pub(crate) async fn session_submit(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    let mut sessions = st.sessions.write().await;
    let Some(session) = sessions.get_mut(&id) else {
        return session_not_found(id);
    };

    match session.request_submit() {
        Ok(()) => {
            st.publish_session_state(id, session.state().as_str());
            (StatusCode::OK, Json(snapshot(id, session))).into_response()
        }
        Err(err) => refuse(&st, err),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/session/{id}/cancel
// ---------------------------------------------------------------------------

pub(crate) async fn session_cancel(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    let mut sessions = st.sessions.write().await;
    let Some(session) = sessions.get_mut(&id) else {
        return session_not_found(id);
    };

    match session.cancel_confirmation() {
        Ok(()) => {
            st.publish_session_state(id, session.state().as_str());
            (StatusCode::OK, Json(snapshot(id, session))).into_response()
        }
        Err(err) => refuse(&st, SessionError::Transition(err)),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/session/{id}/confirm
// ---------------------------------------------------------------------------

/// Run the submission pipeline. The session's write guard is held for the
/// duration, so a second confirm for the same session waits and then gets a
/// 409 — a submission is never run twice for one confirmation.
pub(crate) async fn session_confirm(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    let mut sessions = st.sessions.write().await;
    let Some(session) = sessions.get_mut(&id) else {
        return session_not_found(id);
    };

    let pipeline = SubmissionPipeline::new(Arc::clone(&st.backend));
    // The live adapter uses a blocking HTTP client.
    let result = tokio::task::block_in_place(|| session.confirm_and_submit(&pipeline));

    match result {
        Ok(report) => {
            info!(
                session_id = %id,
                state = report.state.as_str(),
                "submission resolved"
            );
            st.publish_notice(&report.notice);
            st.publish_session_state(id, report.state.as_str());
            (
                StatusCode::OK,
                Json(ConfirmResponse {
                    state: report.state.as_str().to_string(),
                    notice: report.notice,
                    order_id: report.outcome.as_ref().map(|o| o.ack.order_id.clone()),
                    image_path: report.outcome.as_ref().map(|o| o.image_path.clone()),
                }),
            )
                .into_response()
        }
        Err(err) => refuse(&st, SessionError::Transition(err)),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/session/{id}/ack
// ---------------------------------------------------------------------------

pub(crate) async fn session_ack(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    let mut sessions = st.sessions.write().await;
    let Some(session) = sessions.get_mut(&id) else {
        return session_not_found(id);
    };

    match session.acknowledge_success() {
        Ok(()) => {
            st.publish_session_state(id, session.state().as_str());
            (
                StatusCode::OK,
                Json(AckResponse {
                    state: session.state().as_str().to_string(),
                    redirect: st.landing_url.clone(),
                }),
            )
                .into_response()
        }
        Err(err) => refuse(&st, SessionError::Transition(err)),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::Notice(_) => "notice",
                    BusMsg::SessionState { .. } => "session",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
