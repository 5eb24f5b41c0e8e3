use anyhow::{Context, Result};
use clap::Parser;
use cronkeep_core::Config;
use cronkeep_infra::RunLock;
use cronkeep_services::{create_remote_storage, ArchivalPolicy, PolicyRun, RemoteStorage};
use std::path::PathBuf;

use cronkeep_cli::{format_bytes, init_tracing, log_failure, print_json, OutputFormat};

const BINARY: &str = "archive_tool";

#[derive(Parser, Debug)]
#[command(name = "archive_tool")]
#[command(about = "Bundle stale files into a dated zip and offload aged bundles")]
struct Args {
    /// Watched folder (not searched recursively)
    source_folder: PathBuf,

    /// Remote folder the aged bundles are uploaded into
    upload_destination_id: String,

    /// Output format for the run summary
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing(BINARY);
    let args = Args::parse();
    log_failure(BINARY, run(args).await)
}

async fn run(args: Args) -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    let _lock = if config.archive.lock_enabled {
        let ttl = chrono::Duration::hours(i64::from(config.archive.lock_ttl_hours));
        Some(RunLock::acquire(&args.source_folder, ttl).context("Failed to take the run lock")?)
    } else {
        None
    };

    let storage =
        create_remote_storage(&config.remote).context("Failed to initialize remote storage")?;
    tracing::info!(
        folder = %args.source_folder.display(),
        destination = %args.upload_destination_id,
        backend = %storage.backend_type(),
        "Starting archival run"
    );

    let policy = ArchivalPolicy::new(&args.source_folder, config.archive, storage);
    let run = policy.run(&args.upload_destination_id).await?;

    match args.format {
        OutputFormat::Json => print_json(&run)?,
        OutputFormat::Text => print_summary(&run),
    }
    Ok(())
}

fn print_summary(run: &PolicyRun) {
    println!("Folder: {}", run.root.display());
    println!("Files scanned: {} ({} stale)", run.scanned, run.stale);
    match &run.bundle {
        Some(bundle) => {
            let size = std::fs::metadata(&bundle.path).map(|m| m.len()).unwrap_or(0);
            println!(
                "Bundle: {} ({} entries, {}{})",
                bundle.name,
                bundle.entries.len(),
                format_bytes(size),
                if bundle.replaced_existing { ", replaced" } else { "" }
            );
        }
        None => println!("Bundle: none"),
    }
    println!(
        "Bundles seen: {} ({} due for offload)",
        run.bundles_seen, run.offload_eligible
    );
    if let Some(report) = &run.offload {
        for key in &report.uploaded {
            println!("  uploaded {}", key);
        }
        for path in &report.deleted {
            println!("  deleted  {}", path.display());
        }
    }
}
