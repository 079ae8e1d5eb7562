//! pdk — operator CLI for PrintDesk.
//!
//! `submit` drives the same workflow the daemon exposes, end to end, against
//! the configured backend: useful for smoke-testing a deployment or
//! re-entering an order taken over the phone. `config-hash` prints the
//! layered config hash for change tracking.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pdk_backend_memory::MemoryBackend;
use pdk_backend_supabase::SupabaseBackend;
use pdk_config::secrets::resolve_secrets_for_mode;
use pdk_config::{read_str_at, BackendSettings, ConfigMode, LoadedConfig};
use pdk_schemas::ImageFile;
use pdk_workflow::{DetailsPatch, OrderBackend, OrderSession, SubmissionPipeline, WorkflowState};

#[derive(Parser)]
#[command(name = "pdk")]
#[command(about = "PrintDesk CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit an order: upload the image, insert the record.
    Submit {
        /// Path to the artwork image file
        #[arg(long)]
        image: String,

        /// Customer name
        #[arg(long)]
        name: String,

        /// Customer phone number
        #[arg(long)]
        phone: String,

        /// Customer email (optional)
        #[arg(long)]
        email: Option<String>,

        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Backend mode override (MEMORY | LIVE); defaults to /backend/mode
        #[arg(long)]
        mode: Option<String>,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> overrides)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

fn main() -> Result<()> {
    // Dev convenience; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Submit {
            image,
            name,
            phone,
            email,
            config_paths,
            mode,
        } => cmd_submit(&image, name, phone, email, &config_paths, mode),
        Commands::ConfigHash { paths } => cmd_config_hash(&paths),
    }
}

// ---------------------------------------------------------------------------
// submit
// ---------------------------------------------------------------------------

fn cmd_submit(
    image_path: &str,
    name: String,
    phone: String,
    email: Option<String>,
    config_paths: &[String],
    mode_flag: Option<String>,
) -> Result<()> {
    let config = load_config(config_paths)?;

    let mode_str = mode_flag
        .or_else(|| read_str_at(&config.config_json, "/backend/mode"))
        .unwrap_or_else(|| "memory".to_string());
    let mode = pdk_config::parse_config_mode(&mode_str)?;
    let secrets = resolve_secrets_for_mode(&config.config_json, mode.as_str())?;

    let backend = build_backend(mode, &config, secrets.backend_service_key)?;
    let pipeline = SubmissionPipeline::new(backend);

    let file = read_image(image_path)?;

    // Same workflow the form walks: image, details, submit, confirm.
    let mut session = OrderSession::new();
    session.select_image(file)?;
    session.edit_details(DetailsPatch {
        name: Some(name),
        phone: Some(phone),
        email,
    })?;
    session.request_submit()?;

    let report = session.confirm_and_submit(&pipeline)?;
    match report.state {
        WorkflowState::Succeeded => {
            let outcome = report
                .outcome
                .context("succeeded submission must carry an outcome")?;
            println!("order submitted: id={}", outcome.ack.order_id);
            println!("image stored at: {}", outcome.image_path);
            println!("{}", report.notice.description);
            Ok(())
        }
        _ => bail!("{}: {}", report.notice.title, report.notice.description),
    }
}

/// Read the image file and derive its MIME type from the extension. Only
/// image types pass workflow validation, so anything unrecognized is left
/// as an octet-stream and rejected there with the proper notice.
fn read_image(path: &str) -> Result<ImageFile> {
    let bytes = std::fs::read(path).with_context(|| format!("read image failed: {path}"))?;
    let file_name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();
    let content_type = match Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
    .to_string();

    Ok(ImageFile {
        file_name,
        content_type,
        bytes,
    })
}

fn load_config(paths: &[String]) -> Result<LoadedConfig> {
    if paths.is_empty() {
        return pdk_config::load_layered_yaml_from_strings(&["{}"]);
    }
    let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    pdk_config::load_layered_yaml(&refs)
}

fn build_backend(
    mode: ConfigMode,
    config: &LoadedConfig,
    service_key: Option<String>,
) -> Result<Arc<dyn OrderBackend>> {
    let settings = BackendSettings::from_config(&config.config_json);
    match mode {
        ConfigMode::Memory => Ok(Arc::new(MemoryBackend::new())),
        ConfigMode::Live => {
            let Some(base_url) = settings.base_url else {
                bail!("LIVE mode requires /backend/base_url in config");
            };
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

// ---------------------------------------------------------------------------
// config-hash
// ---------------------------------------------------------------------------

fn cmd_config_hash(paths: &[String]) -> Result<()> {
    let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = pdk_config::load_layered_yaml(&refs)?;
    println!("config_hash: {}", loaded.config_hash);
    println!("canonical_json: {}", loaded.canonical_json);
    Ok(())
}
