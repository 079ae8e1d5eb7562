//! The Order Backend contract.
//!
//! The workflow sees the external managed service as exactly two operations:
//! store a blob under a path, insert an order row. Everything behind those
//! operations (vendor API, auth, retries the vendor does internally) is the
//! adapter's business. Adapters live in their own crates — a deterministic
//! in-memory one for tests and dev mode (`pdk-backend-memory`) and a live
//! HTTP one (`pdk-backend-supabase`).

use std::sync::Arc;

use pdk_schemas::{NewOrderRecord, OrderAck};

/// Convenience alias used throughout the backend seam.
pub type BackendResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// A blob to store under a generated object path.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Generated object path, e.g. "3f2a….png". Never customer-supplied.
    pub path: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Acknowledgment that the object store holds the blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// The path the object is stored under — referenced by the order record.
    pub path: String,
}

// ---------------------------------------------------------------------------
// OrderBackend trait
// ---------------------------------------------------------------------------

/// Trait all Order Backend adapters implement.
///
/// The submission pipeline calls `upload_image` first and `create_order`
/// only after the upload succeeded — adapters never see the reverse order.
pub trait OrderBackend: Send + Sync {
    fn upload_image(&self, req: UploadRequest) -> BackendResult<UploadReceipt>;
    fn create_order(&self, record: NewOrderRecord) -> BackendResult<OrderAck>;
}

/// Adapters are usually shared behind an `Arc` by the daemon; forwarding
/// impls keep call sites generic over `B: OrderBackend`.
impl<T: OrderBackend + ?Sized> OrderBackend for Arc<T> {
    fn upload_image(&self, req: UploadRequest) -> BackendResult<UploadReceipt> {
        (**self).upload_image(req)
    }

    fn create_order(&self, record: NewOrderRecord) -> BackendResult<OrderAck> {
        (**self).create_order(record)
    }
}

impl<T: OrderBackend + ?Sized> OrderBackend for &T {
    fn upload_image(&self, req: UploadRequest) -> BackendResult<UploadReceipt> {
        (**self).upload_image(req)
    }

    fn create_order(&self, record: NewOrderRecord) -> BackendResult<OrderAck> {
        (**self).create_order(record)
    }
}
