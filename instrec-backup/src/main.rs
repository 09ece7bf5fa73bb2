//! instrec-backup - Instructor records backup
//!
//! Logs in to the enrollment portal through a WebDriver-controlled browser,
//! walks every instructor's records and mirrors the attached files to a local
//! folder tree and to Google Drive. Re-running is safe: anything already
//! present locally is skipped.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use instrec_backup::config::{BackupConfig, CliOverrides, ConfigFile, Credentials, PASSWORD_ENV, USERNAME_ENV};
use instrec_backup::models::OwnerKey;
use instrec_backup::remote::{ensure_folder, DriveStore};
use instrec_backup::services::{
    sync_local_mirror, MirrorReconciler, RecordDiscovery, ReconcileMode, RunOrchestrator,
    SessionGatekeeper,
};
use instrec_backup::session::WebDriverSession;
use instrec_backup::transfer::ReqwestFetcher;
use instrec_common::config::{default_config_path, load_toml_config, LoggingConfig};

/// Command-line arguments for instrec-backup
#[derive(Parser, Debug)]
#[command(name = "instrec-backup")]
#[command(about = "Back up instructor training records locally and to Google Drive")]
#[command(version)]
struct Cli {
    /// Config file (default: <config dir>/instrec/config.toml)
    #[arg(long, global = true, env = "INSTREC_CONFIG")]
    config: Option<PathBuf>,

    /// Local mirror root folder
    #[arg(long, global = true)]
    root_folder: Option<PathBuf>,

    /// WebDriver endpoint, e.g. http://localhost:9515
    #[arg(long, global = true)]
    webdriver_url: Option<String>,

    /// Skip granularity for already mirrored data
    #[arg(long, global = true, value_enum)]
    mode: Option<ReconcileMode>,

    /// Login and listing navigation attempts
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Run a full backup (default)
    Run,
    /// Push the local mirror tree to Google Drive without visiting the portal
    SyncLocal,
    /// Print the owner folder name for raw listing names
    Canonicalize {
        /// Raw listing text, e.g. "Albers Needs Monitoring, Becca"
        #[arg(required = true)]
        raw: Vec<String>,
    },
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            root_folder: self.root_folder.clone(),
            webdriver_url: self.webdriver_url.clone(),
            mode: self.mode,
            max_retries: self.max_retries,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Command::Canonicalize { raw }) = &cli.command {
        for (index, name) in raw.iter().enumerate() {
            println!("{}\t{}", OwnerKey::resolve(name, None, index + 1), name);
        }
        return Ok(());
    }

    let config_path = cli.config.clone().or_else(default_config_path);
    let file: ConfigFile = match &config_path {
        Some(path) => load_toml_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ConfigFile::default(),
    };
    let config = BackupConfig::resolve(&file, &cli.overrides());

    init_tracing(&config.logging)?;

    let (git_hash, built, profile) = instrec_backup::build_info();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash,
        built,
        profile,
        "Starting instrec-backup"
    );
    info!(
        local_root = %config.local_root.display(),
        remote_root = %config.remote_root_folder,
        mode = %config.mode,
        "Mirror locations"
    );

    match cli.command.clone().unwrap_or(Command::Run) {
        Command::Run => run_backup(&config).await,
        Command::SyncLocal => run_sync_local(&config).await,
        Command::Canonicalize { .. } => Ok(()),
    }
}

async fn run_backup(config: &BackupConfig) -> Result<()> {
    // Fail before any network activity
    let Some(credentials) = Credentials::from_env() else {
        bail!("{} and {} must be set", USERNAME_ENV, PASSWORD_ENV);
    };

    tokio::fs::create_dir_all(&config.local_root)
        .await
        .with_context(|| format!("Failed to create {}", config.local_root.display()))?;

    let store = DriveStore::connect(&config.drive)
        .await
        .context("Failed to authorize Google Drive")?;
    let remote_root = ensure_folder(&store, &config.remote_root_folder, None)
        .await
        .context("Failed to resolve remote root folder")?;

    let fetcher = ReqwestFetcher::new(Duration::from_secs(300)).context("Failed to build HTTP client")?;

    let mut session = WebDriverSession::connect(&config.webdriver)
        .await
        .with_context(|| format!("Failed to start WebDriver session at {}", config.webdriver.server_url))?;

    let reconciler = MirrorReconciler::new(
        &store,
        &fetcher,
        config.local_root.clone(),
        remote_root,
        config.mode,
    );
    let mut orchestrator = RunOrchestrator::new(
        SessionGatekeeper::new(config.gatekeeper.clone(), Some(credentials)),
        RecordDiscovery::new(config.layout.clone()),
        reconciler,
    )
    .with_failure_pause(config.failure_pause);

    let result = orchestrator.run(&mut session).await;

    if let Err(e) = session.quit().await {
        warn!(error = %e, "Failed to close WebDriver session");
    }

    let summary = result.context("Backup run aborted")?;
    println!("\n{}\n", summary.final_line());
    Ok(())
}

async fn run_sync_local(config: &BackupConfig) -> Result<()> {
    let store = DriveStore::connect(&config.drive)
        .await
        .context("Failed to authorize Google Drive")?;
    let remote_root = ensure_folder(&store, &config.remote_root_folder, None)
        .await
        .context("Failed to resolve remote root folder")?;

    let summary = sync_local_mirror(&store, &config.local_root, &remote_root)
        .await
        .context("Local mirror sync failed")?;

    println!(
        "\nSynced {} folder(s): {} file(s) created, {} updated, {} failure(s).\n",
        summary.folders, summary.files_created, summary.files_updated, summary.failures
    );
    Ok(())
}

/// `RUST_LOG` wins over the configured level; output to stderr or the log file
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("instrec_backup={0},instrec_common={0}", logging.level)));

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
