//! Runtime secret resolution — the single source of truth.
//!
//! # Contract
//! - Config YAML stores only **env var NAMES** (e.g., `"PDK_BACKEND_SERVICE_KEY"`).
//! - At startup, callers invoke `resolve_secrets_for_mode()` once.
//! - The returned `ResolvedSecrets` is passed into constructors; never scatter
//!   `std::env::var` calls across the codebase.
//! - `Debug` impls on secret-containing structs **redact** values.
//! - Error messages reference the env var **NAME**, never the value.
//!
//! # Mode-aware enforcement
//! - `LIVE`:   backend service key is **required**.
//! - `MEMORY`: no keys required — the in-memory backend takes no credentials.

use anyhow::{bail, Result};
use serde_json::Value;

use crate::read_str_at;

/// All runtime-resolved secrets for one service instantiation.
///
/// Built **once** at startup via [`resolve_secrets_for_mode`].
/// **Values are redacted in `Debug` output.**
#[derive(Clone)]
pub struct ResolvedSecrets {
    /// Backend service key (storage + record store share it). `None` if the
    /// named env var was absent or empty.
    pub backend_service_key: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field(
                "backend_service_key",
                &self.backend_service_key.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Resolve a named environment variable.
/// Returns `None` if the variable is unset or its value is blank.
/// Never returns the value in an error path — callers report the NAME only.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Env var name for the backend service key, read from the config JSON.
/// Falls back to the well-known default if the pointer is absent.
fn service_key_var(config_json: &Value) -> String {
    read_str_at(config_json, "/backend/keys_env/service_key")
        .unwrap_or_else(|| "PDK_BACKEND_SERVICE_KEY".to_string())
}

/// Resolve all secrets from the environment for the given `mode` string.
///
/// `mode` is case-insensitive: `"LIVE"` or `"MEMORY"`.
///
/// # Errors
/// Returns `Err` with the **env var NAME** of the missing required variable.
/// The actual value is never mentioned.
pub fn resolve_secrets_for_mode(config_json: &Value, mode: &str) -> Result<ResolvedSecrets> {
    let var_name = service_key_var(config_json);
    let mode_upper = mode.trim().to_ascii_uppercase();

    let backend_service_key = resolve_env(&var_name);

    match mode_upper.as_str() {
        "LIVE" => {
            if backend_service_key.is_none() {
                bail!(
                    "SECRETS_MISSING mode=LIVE: required env var '{}' \
                     (backend service key) is not set or empty",
                    var_name,
                );
            }
        }
        "MEMORY" => {
            // No required secrets — the in-memory backend is credential-free.
        }
        other => {
            bail!(
                "SECRETS_UNKNOWN_MODE: unrecognised mode '{}'; \
                 expected one of: LIVE | MEMORY",
                other,
            );
        }
    }

    Ok(ResolvedSecrets {
        backend_service_key,
    })
}
