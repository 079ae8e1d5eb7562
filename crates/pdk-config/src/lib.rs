use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

pub mod secrets;

/// Known secret-like prefixes / patterns. If any leaf string value in the
/// effective config starts with one of these, we abort with
/// CONFIG_SECRET_DETECTED. Config YAML must store env var NAMES, never
/// credential values (see `secrets`).
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // Stripe / OpenAI style
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "eyJ",        // JWT (Supabase service/anon keys are JWTs)
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "gho_",       // GitHub OAuth
    "glpat-",     // GitLab PAT
    "xoxb-",      // Slack bot token
    "xoxp-",      // Slack user token
];

/// Which backend the service talks to. Selected by `/backend/mode` in config
/// (or `--mode` on the CLI).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigMode {
    /// Deterministic in-memory backend; no credentials required.
    Memory,
    /// Managed remote backend; service key required.
    Live,
}

impl ConfigMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigMode::Memory => "MEMORY",
            ConfigMode::Live => "LIVE",
        }
    }
}

/// Parse a mode string (config value or CLI flag) into a [`ConfigMode`].
pub fn parse_config_mode(mode: &str) -> Result<ConfigMode> {
    match mode.trim().to_uppercase().as_str() {
        "MEMORY" => Ok(ConfigMode::Memory),
        "LIVE" => Ok(ConfigMode::Live),
        other => bail!("invalid mode '{}'. expected one of: MEMORY | LIVE", other),
    }
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    // Merge YAML docs in order: earlier docs are base, later docs override.
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    // Enforce "no secrets as literal values" policy.
    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Read a non-empty string value at `pointer`, trimmed. `None` if the pointer
/// is absent, the value is not a string, or it is blank.
pub fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn canonicalize_json(v: &Value) -> Result<String> {
    // Merge order is deterministic for deterministic inputs, so a plain
    // compact serialization is a stable canonical form.
    let s = serde_json::to_string(v).context("canonical json serialize failed")?;
    Ok(s)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let out = hasher.finalize();
    hex::encode(out)
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(val) = v.pointer(&ptr) {
            if let Some(s) = val.as_str() {
                if looks_like_secret(s) {
                    bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
                }
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => {
            // Leaf
            let p = if prefix.is_empty() {
                "/".to_string()
            } else {
                prefix.to_string()
            };
            out.push(p);
        }
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

/// Settings the service reads from the effective config, with defaults for
/// anything a dev-mode deployment can live without.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL of the managed backend, e.g. "https://xyz.supabase.co".
    /// Required in LIVE mode only.
    pub base_url: Option<String>,
    /// Object storage bucket for uploaded artwork.
    pub bucket: String,
    /// Order table name in the record store.
    pub table: String,
}

impl BackendSettings {
    /// Extract backend settings from the effective config JSON.
    pub fn from_config(config_json: &Value) -> Self {
        Self {
            base_url: read_str_at(config_json, "/backend/base_url"),
            bucket: read_str_at(config_json, "/backend/bucket")
                .unwrap_or_else(|| "artworks".to_string()),
            table: read_str_at(config_json, "/backend/table")
                .unwrap_or_else(|| "print_orders".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_merge_overrides_scalars_and_keeps_siblings() {
        let base = serde_json::json!({"backend": {"bucket": "a", "table": "t"}});
        let over = serde_json::json!({"backend": {"bucket": "b"}});
        let merged = deep_merge(base, over);
        assert_eq!(merged["backend"]["bucket"], "b");
        assert_eq!(merged["backend"]["table"], "t");
    }

    #[test]
    fn parse_config_mode_accepts_case_insensitive() {
        assert_eq!(parse_config_mode("memory").unwrap(), ConfigMode::Memory);
        assert_eq!(parse_config_mode(" Live ").unwrap(), ConfigMode::Live);
        assert!(parse_config_mode("paper").is_err());
    }

    #[test]
    fn backend_settings_defaults() {
        let cfg = serde_json::json!({});
        let s = BackendSettings::from_config(&cfg);
        assert_eq!(s.bucket, "artworks");
        assert_eq!(s.table, "print_orders");
        assert!(s.base_url.is_none());
    }

    #[test]
    fn short_strings_are_not_secrets() {
        assert!(!looks_like_secret("sk-a"));
        assert!(looks_like_secret("sk-live-abcdef123456"));
    }
}
