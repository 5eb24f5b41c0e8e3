use anyhow::{Context, Result};
use clap::Parser;
use cronkeep_core::Config;
use cronkeep_services::{SmtpNotifier, StorageAlert, SysinfoDiskProbe};
use std::path::PathBuf;
use std::sync::Arc;

use cronkeep_cli::{format_bytes, init_tracing, log_failure, print_json, OutputFormat};

const BINARY: &str = "check_storage";

#[derive(Parser, Debug)]
#[command(name = "check_storage")]
#[command(about = "Email an alert when free disk space drops to a percentage")]
struct Args {
    /// Alert when free space is at or below this percent of the disk
    #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
    percent: u8,

    /// Address the alert is sent to
    mailto: String,

    /// Any path on the filesystem to check
    #[arg(long, default_value = "/")]
    path: PathBuf,

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
    let notifier = SmtpNotifier::from_config(&config.mail).context("Failed to set up mail")?;

    let alert = StorageAlert::new(Arc::new(SysinfoDiskProbe::new()), Arc::new(notifier));
    let outcome = alert.run(&args.path, args.percent, &args.mailto).await?;

    match args.format {
        OutputFormat::Json => print_json(&outcome)?,
        OutputFormat::Text => {
            let usage = &outcome.usage;
            println!(
                "{}: {} free of {} ({:.2} %)",
                usage.mount_point.display(),
                format_bytes(usage.free),
                format_bytes(usage.total),
                usage.free_percent()
            );
            if outcome.alerted {
                println!("Alert sent to {}", args.mailto);
            }
        }
    }
    Ok(())
}
