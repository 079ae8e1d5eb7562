//! Deterministic in-memory Order Backend.
//!
//! Design decisions (kept intentionally simple/deterministic):
//! - `order_id` is a stable string derived from the insertion sequence:
//!   "mem-order-{seq}", starting at 1.
//! - No randomness. No wall-clock reads — `created_at` is the Unix epoch.
//! - Uploads are idempotent on path: re-uploading the same path overwrites.
//! - Failure injection (`fail_uploads` / `fail_inserts`) for scenario
//!   wiring; both default to off.
//!
//! Serves two roles: the backend for MEMORY mode (local dev without the
//! managed service) and the fake behind every workflow scenario test.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::DateTime;
use pdk_schemas::{NewOrderRecord, OrderAck};
use pdk_workflow::{BackendResult, OrderBackend, UploadReceipt, UploadRequest};

// ---------------------------------------------------------------------------
// InjectedFault
// ---------------------------------------------------------------------------

/// The error surfaced when failure injection is armed for an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedFault {
    pub op: &'static str,
}

impl std::fmt::Display for InjectedFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "injected {} failure", self.op)
    }
}

impl std::error::Error for InjectedFault {}

// ---------------------------------------------------------------------------
// Stored state
// ---------------------------------------------------------------------------

/// A blob held by the in-memory object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct Inner {
    objects: BTreeMap<String, StoredObject>,
    orders: BTreeMap<String, NewOrderRecord>,
    seq: u64,
    fail_uploads: bool,
    fail_inserts: bool,
}

// ---------------------------------------------------------------------------
// MemoryBackend
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm or disarm upload failure injection.
    pub fn set_fail_uploads(&self, fail: bool) {
        self.lock().fail_uploads = fail;
    }

    /// Arm or disarm insert failure injection.
    pub fn set_fail_inserts(&self, fail: bool) {
        self.lock().fail_inserts = fail;
    }

    /// Deterministic listing: BTreeMap iteration order is stable.
    pub fn object_paths(&self) -> Vec<String> {
        self.lock().objects.keys().cloned().collect()
    }

    pub fn object(&self, path: &str) -> Option<StoredObject> {
        self.lock().objects.get(path).cloned()
    }

    /// `(order_id, record)` pairs in insertion (= id) order.
    pub fn orders(&self) -> Vec<(String, NewOrderRecord)> {
        self.lock()
            .orders
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn order_count(&self) -> usize {
        self.lock().orders.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panic mid-operation in another test
        // thread; the stored state is plain data, safe to keep using.
        match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl OrderBackend for MemoryBackend {
    fn upload_image(&self, req: UploadRequest) -> BackendResult<UploadReceipt> {
        let mut inner = self.lock();
        if inner.fail_uploads {
            return Err(Box::new(InjectedFault { op: "upload" }));
        }
        inner.objects.insert(
            req.path.clone(),
            StoredObject {
                content_type: req.content_type,
                bytes: req.bytes,
            },
        );
        Ok(UploadReceipt { path: req.path })
    }

    fn create_order(&self, record: NewOrderRecord) -> BackendResult<OrderAck> {
        let mut inner = self.lock();
        if inner.fail_inserts {
            return Err(Box::new(InjectedFault { op: "insert" }));
        }
        inner.seq += 1;
        let order_id = format!("mem-order-{}", inner.seq);
        inner.orders.insert(order_id.clone(), record);
        Ok(OrderAck {
            order_id,
            created_at: DateTime::UNIX_EPOCH,
        })
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
