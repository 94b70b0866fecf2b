// ABOUTME: Entry point for the lander CLI application.
// ABOUTME: Parses arguments, sets up logging and dispatches to serve or status.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use lander::config::{Config, ENV_WORK_DIR, ENV_WORK_DIR_FALLBACK};
use lander::deploy::Pipeline;
use lander::error::{Error, Result};
use lander::server;
use lander::store::ArchiveStore;
use lander::types::Digest;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise the verbose flag picks the level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve { config, port } => {
            let mut config = Config::resolve(config.as_deref())?;
            if let Some(port) = port {
                config.port = port;
            }
            serve(config).await
        }
        Commands::Status {
            config,
            work_dir,
            json,
        } => {
            let root = status_root(config.as_deref(), work_dir)?;
            status(&root, json)
        }
    }
}

/// Open the store and run the HTTP server until shutdown.
async fn serve(config: Config) -> Result<()> {
    let store = ArchiveStore::open(&config.work_dir)?;
    tracing::info!(
        root = %store.root().display(),
        current = ?store.current()?.map(|d| d.short().to_string()),
        "archive store ready"
    );

    let pipeline = Pipeline::new(store);
    server::serve(&config, pipeline).await
}

/// Work root for `status`: explicit flag, config file, or the environment.
///
/// Only the work root is needed, so a missing secret key is not an error here.
fn status_root(config: Option<&Path>, work_dir: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = work_dir {
        return Ok(dir);
    }
    if let Some(path) = config {
        return Config::load_work_dir(path);
    }
    std::env::var(ENV_WORK_DIR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| {
            std::env::var(ENV_WORK_DIR_FALLBACK)
                .ok()
                .filter(|v| !v.trim().is_empty())
        })
        .map(PathBuf::from)
        .ok_or_else(|| Error::MissingEnvVar(ENV_WORK_DIR.to_string()))
}

#[derive(Serialize)]
struct StatusReport {
    work_root: PathBuf,
    current: Option<Digest>,
    versions: Vec<Digest>,
}

fn status(root: &Path, json: bool) -> Result<()> {
    if !root.is_dir() {
        return Err(Error::InvalidConfig(format!(
            "work root {} does not exist",
            root.display()
        )));
    }
    let store = ArchiveStore::open(root)?;
    let report = StatusReport {
        work_root: store.root().to_path_buf(),
        current: store.current()?,
        versions: store.versions()?,
    };

    if json {
        println!("{}", serde_json::to_string(&report)?);
        return Ok(());
    }

    println!("Work root: {}", report.work_root.display());
    match &report.current {
        Some(digest) => println!("Current: {digest}"),
        None => println!("Current: (none)"),
    }
    println!("Versions: {}", report.versions.len());
    for version in &report.versions {
        println!("  {version}");
    }
    Ok(())
}
