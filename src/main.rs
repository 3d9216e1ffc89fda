//! clippilot - drives a web video editor through Chrome to cut clips
//! and strip backgrounds.
//!
//! Main entry point for the clippilot CLI.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use clippilot_browser::{SessionConfig, SessionManager};
use clippilot_pipeline::bridge::CdpPageProvider;
use clippilot_pipeline::progress::TracingProgressSink;
use clippilot_pipeline::status::TracingStatusSink;
use clippilot_pipeline::{Job, JobDriver, PipelineConfig};
use clippilot_registry::{EditorRegistry, FileRegistryStore};

mod config;

use config::AppConfig;

/// clippilot CLI.
#[derive(Parser)]
#[command(name = "clippilot")]
#[command(about = "Automates a web video editor: upload, trim, cutout, export")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one job to its terminal state
    Run {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Target clip duration in seconds (defaults to the configured value)
        #[arg(short, long)]
        duration: Option<f64>,
    },

    /// Manage the editor pool
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },

    /// Check that Chrome is available
    Doctor,
}

#[derive(Subcommand)]
enum RegistryAction {
    /// List all editors and their lease status
    List,

    /// Register an editor session URL
    Add { url: String },

    /// Remove an editor from the pool
    Remove { url: String },

    /// Force-release a stuck lease
    Release { url: String },
}

/// Base state directory (`~/.clippilot`).
fn state_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".clippilot"))
        .unwrap_or_else(|| PathBuf::from(".clippilot"))
}

/// Initialize tracing with console and rolling-file output.
fn init_tracing() -> anyhow::Result<()> {
    let log_dir = state_dir().join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("clippilot")
        .filename_suffix("log")
        .max_log_files(30)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the writer guard alive for the program duration.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

fn build_registry(app: &AppConfig) -> Arc<EditorRegistry> {
    let store = FileRegistryStore::new(app.registry_path());
    Arc::new(EditorRegistry::new(Arc::new(store)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let cli = Cli::parse();
    let app = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Run { input, duration } => run_job(app, input, duration).await,
        Commands::Registry { action } => run_registry(app, action).await,
        Commands::Doctor => run_doctor(app).await,
    }
}

/// Run one job to completion or failure.
async fn run_job(app: AppConfig, input: PathBuf, duration: Option<f64>) -> anyhow::Result<()> {
    info!("Starting clippilot v{}", env!("CARGO_PKG_VERSION"));

    let pipeline: PipelineConfig = app.pipeline_config();
    let registry = build_registry(&app);

    // Leases left over from a killed process would starve the pool
    // forever; anything older than the configured bound cannot belong
    // to a live job.
    let recovered = registry
        .recover_stale(chrono::Duration::seconds(pipeline.max_lease_age_secs as i64))
        .await
        .context("lease recovery failed")?;
    if recovered > 0 {
        info!("Recovered {} stale lease(s)", recovered);
    }

    let session_config: SessionConfig = app.session_config();
    let manager = Arc::new(SessionManager::new(session_config));
    let provider = Arc::new(CdpPageProvider::new(manager.clone()));

    let target = duration.unwrap_or(pipeline.target_duration_secs);
    let job = Job::new(input, target);
    info!("Job {} for {}", job.id, job.input.display());

    let driver = JobDriver::new(
        registry,
        provider,
        pipeline,
        Arc::new(TracingProgressSink),
        Arc::new(TracingStatusSink),
    );

    let outcome = driver.run(&job).await;

    // The browser only lives for the job in CLI mode.
    let _ = manager.shutdown().await;

    let report = outcome.context("job failed")?;
    println!("Exported: {}", report.output.display());
    for record in &report.stages {
        println!("  {:<24} {:>8.1}s", record.stage.name(), record.elapsed.as_secs_f64());
    }
    Ok(())
}

/// Handle registry subcommands.
async fn run_registry(app: AppConfig, action: RegistryAction) -> anyhow::Result<()> {
    let registry = build_registry(&app);

    match action {
        RegistryAction::List => {
            let editors = registry.list().await?;
            if editors.is_empty() {
                println!("No editors registered.");
                return Ok(());
            }
            println!("{:<60} {:<10} {}", "URL", "STATUS", "LEASED AT");
            for editor in editors {
                let leased = editor
                    .leased_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string());
                let status = if editor.is_available() { "available" } else { "in-use" };
                println!("{:<60} {:<10} {}", editor.url, status, leased);
            }
        }
        RegistryAction::Add { url } => {
            registry.add(&url).await?;
            println!("Registered {}", url);
        }
        RegistryAction::Remove { url } => {
            registry.remove(&url).await?;
            println!("Removed {}", url);
        }
        RegistryAction::Release { url } => {
            registry.release(&url).await?;
            println!("Released {}", url);
        }
    }
    Ok(())
}

/// Probe the Chrome setup.
async fn run_doctor(app: AppConfig) -> anyhow::Result<()> {
    match SessionManager::find_chrome() {
        Some(path) => println!("Chrome binary:   {}", path.display()),
        None => println!("Chrome binary:   NOT FOUND; install Google Chrome or Chromium"),
    }

    let session_config = app.session_config();
    let endpoint = session_config.endpoint();
    match reqwest_probe(&endpoint).await {
        Ok(version) => println!("Debug endpoint:  {} ({})", endpoint, version),
        Err(_) => println!("Debug endpoint:  {} (not running; will be launched on demand)", endpoint),
    }

    let registry = build_registry(&app);
    let editors = registry.list().await?;
    let available = editors.iter().filter(|e| e.is_available()).count();
    println!("Editor pool:     {} registered, {} available", editors.len(), available);

    Ok(())
}

/// Minimal version probe against the CDP HTTP endpoint.
async fn reqwest_probe(endpoint: &str) -> anyhow::Result<String> {
    let body: serde_json::Value = reqwest::get(format!("{}/json/version", endpoint))
        .await?
        .json()
        .await?;
    Ok(body["Browser"].as_str().unwrap_or("unknown").to_string())
}
