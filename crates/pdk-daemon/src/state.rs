//! Shared runtime state for pdk-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. Sessions live in an
//! in-memory map; the backend is whatever `main.rs` (or a test) wired in
//! behind the `OrderBackend` trait object.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pdk_schemas::Notice;
use pdk_workflow::{OrderBackend, OrderSession};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// BusMsg — SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE
/// events. `Notice` is the toast channel: validation failures, backend
/// failure messages, and success confirmations all travel here.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    Notice(Notice),
    SessionState { session_id: Uuid, state: String },
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Cloneable (Arc) handle shared across all Axum handlers.
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    /// Static build metadata.
    pub build: BuildInfo,
    /// One workflow session per in-progress order draft.
    pub sessions: RwLock<HashMap<Uuid, OrderSession>>,
    /// The wired Order Backend (memory in dev/tests, Supabase in LIVE).
    pub backend: Arc<dyn OrderBackend>,
    /// Where the front end may send the customer after acknowledging
    /// success. Comes from `/app/landing_url` in config.
    pub landing_url: Option<String>,
}

impl AppState {
    pub fn new(backend: Arc<dyn OrderBackend>, landing_url: Option<String>) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        Self {
            bus,
            build: BuildInfo {
                service: "pdk-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            sessions: RwLock::new(HashMap::new()),
            backend,
            landing_url,
        }
    }

    /// Broadcast a notice; send errors (no subscribers) are ignored.
    pub fn publish_notice(&self, notice: &Notice) {
        let _ = self.bus.send(BusMsg::Notice(notice.clone()));
    }

    pub fn publish_session_state(&self, session_id: Uuid, state: &str) {
        let _ = self.bus.send(BusMsg::SessionState {
            session_id,
            state: state.to_string(),
        });
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
