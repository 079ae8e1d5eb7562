//! Live Order Backend adapter for a Supabase-style managed service.
//!
//! Two endpoints, matching the two trait operations:
//! - object store: `POST {base_url}/storage/v1/object/{bucket}/{path}`
//!   with the blob's content type and raw bytes.
//! - record store: `POST {base_url}/rest/v1/{table}` with a JSON row and
//!   `Prefer: return=representation` so the ack can carry the assigned id.
//!
//! Both requests authenticate with the service key as `Authorization:
//! Bearer …` plus the vendor's `apikey` header. Non-2xx responses become
//! errors carrying the status and a short body snippet — that detail stays
//! in the log; user-facing notices are built upstream and stay generic.
//!
//! Transport is blocking `reqwest`; async callers (the daemon) wrap calls
//! in `tokio::task::block_in_place`.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use pdk_schemas::{NewOrderRecord, OrderAck};
use pdk_workflow::{BackendResult, OrderBackend, UploadReceipt, UploadRequest};
use tracing::debug;

/// Longest response-body snippet carried in an error message.
const BODY_SNIPPET_MAX: usize = 256;

pub struct SupabaseBackend {
    http: reqwest::blocking::Client,
    base_url: String,
    bucket: String,
    table: String,
    service_key: String,
}

impl std::fmt::Debug for SupabaseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // service_key is a credential; never print it.
        f.debug_struct("SupabaseBackend")
            .field("base_url", &self.base_url)
            .field("bucket", &self.bucket)
            .field("table", &self.table)
            .field("service_key", &"<REDACTED>")
            .finish()
    }
}

impl SupabaseBackend {
    /// `base_url` without a trailing slash, e.g. "https://xyz.supabase.co".
    pub fn new(
        base_url: impl Into<String>,
        bucket: impl Into<String>,
        table: impl Into<String>,
        service_key: impl Into<String>,
    ) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::blocking::Client::new(),
            base_url,
            bucket: bucket.into(),
            table: table.into(),
            service_key: service_key.into(),
        }
    }

    fn storage_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, path
        )
    }

    fn rest_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn do_upload(&self, req: UploadRequest) -> Result<UploadReceipt> {
        let url = self.storage_url(&req.path);
        debug!(url = %url, content_type = %req.content_type, "uploading image");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header(reqwest::header::CONTENT_TYPE, &req.content_type)
            .body(req.bytes)
            .send()
            .with_context(|| format!("storage upload request failed: {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = body_snippet(resp);
            bail!("storage upload rejected: status={status} body={body}");
        }

        Ok(UploadReceipt { path: req.path })
    }

    fn do_insert(&self, record: NewOrderRecord) -> Result<OrderAck> {
        let url = self.rest_url();
        debug!(url = %url, "inserting order record");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("Prefer", "return=representation")
            .json(&record)
            .send()
            .with_context(|| format!("order insert request failed: {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = body_snippet(resp);
            bail!("order insert rejected: status={status} body={body}");
        }

        let body: serde_json::Value = resp.json().context("order insert response is not JSON")?;
        Ok(parse_ack(&body))
    }
}

impl OrderBackend for SupabaseBackend {
    fn upload_image(&self, req: UploadRequest) -> BackendResult<UploadReceipt> {
        self.do_upload(req).map_err(Into::into)
    }

    fn create_order(&self, record: NewOrderRecord) -> BackendResult<OrderAck> {
        self.do_insert(record).map_err(Into::into)
    }
}

/// Read at most [`BODY_SNIPPET_MAX`] chars of an error response body.
fn body_snippet(resp: reqwest::blocking::Response) -> String {
    match resp.text() {
        Ok(t) => {
            let mut s: String = t.chars().take(BODY_SNIPPET_MAX).collect();
            if s.len() < t.len() {
                s.push('…');
            }
            s
        }
        Err(_) => "<unreadable body>".to_string(),
    }
}

/// Extract the ack from a `return=representation` response: an array with
/// the inserted row. Tolerant of shape drift — a missing id falls back to
/// an empty string rather than failing a submission that the backend has
/// already durably accepted.
fn parse_ack(body: &serde_json::Value) -> OrderAck {
    let row = body.get(0).unwrap_or(body);

    let order_id = match row.get("id") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    let created_at = row
        .get("created_at")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    OrderAck {
        order_id,
        created_at,
    }
}

// ---------------------------------------------------------------------------
// Unit tests (URL building and ack parsing; no network)
// ---------------------------------------------------------------------------
