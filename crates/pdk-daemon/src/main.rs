//! pdk-daemon entry point.
//!
//! This file is intentionally thin: it sets up tracing, loads config and
//! secrets, wires the backend, and starts the HTTP server. All route
//! handlers live in `routes.rs`; all shared state types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{bail, Context};
use axum::http::{HeaderValue, Method};
use pdk_backend_memory::MemoryBackend;
use pdk_backend_supabase::SupabaseBackend;
use pdk_config::secrets::resolve_secrets_for_mode;
use pdk_config::{read_str_at, BackendSettings, ConfigMode, LoadedConfig};
use pdk_daemon::{routes, state};
use pdk_workflow::OrderBackend;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience).
    // Silent if the file does not exist — production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let config = load_config()?;
    info!(config_hash = %config.config_hash, "config loaded");

    let mode_str = read_str_at(&config.config_json, "/backend/mode")
        .unwrap_or_else(|| "memory".to_string());
    let mode = pdk_config::parse_config_mode(&mode_str)?;
    let secrets = resolve_secrets_for_mode(&config.config_json, mode.as_str())?;

    let backend = build_backend(mode, &config, secrets.backend_service_key)?;
    let landing_url = read_str_at(&config.config_json, "/app/landing_url");

    let shared = Arc::new(state::AppState::new(backend, landing_url));

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr_from_env().unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8787)));
    info!(mode = mode.as_str(), "pdk-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

/// Layered config paths come from `PDK_CONFIG` (comma-separated, merge
/// order base → overrides). Unset means an empty config: memory mode with
/// defaults, which is what local dev wants.
fn load_config() -> anyhow::Result<LoadedConfig> {
    match std::env::var("PDK_CONFIG") {
        Ok(paths) => {
            let paths: Vec<&str> = paths
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect();
            pdk_config::load_layered_yaml(&paths)
        }
        Err(_) => pdk_config::load_layered_yaml_from_strings(&["{}"]),
    }
}

fn build_backend(
    mode: ConfigMode,
    config: &LoadedConfig,
    service_key: Option<String>,
) -> anyhow::Result<Arc<dyn OrderBackend>> {
    let settings = BackendSettings::from_config(&config.config_json);
    match mode {
        ConfigMode::Memory => Ok(Arc::new(MemoryBackend::new())),
        ConfigMode::Live => {
            let Some(base_url) = settings.base_url else {
                bail!("LIVE mode requires /backend/base_url in config");
            };
            // Secret enforcement already ran; this is a second fail-closed check.
            let Some(key) = service_key else {
                bail!("LIVE mode requires the backend service key");
            };
            Ok(Arc::new(SupabaseBackend::new(
                base_url,
                settings.bucket,
                settings.table,
                key,
            )))
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("PDK_DAEMON_ADDR").ok()?.parse().ok()
}

/// CORS: allow only localhost origins (the dev front end).
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
