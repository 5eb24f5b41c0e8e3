use anyhow::{Context, Result};
use clap::Parser;
use cronkeep_core::Config;
use cronkeep_services::{LogReport, LogReportOptions, SmtpNotifier};
use std::path::PathBuf;
use std::sync::Arc;

use cronkeep_cli::{init_tracing, log_failure, print_json, OutputFormat};

const BINARY: &str = "log_sender";

#[derive(Parser, Debug)]
#[command(name = "log_sender")]
#[command(about = "Email the latest log of each matching test run")]
struct Args {
    /// Address the logs are sent to
    mailto: String,

    /// Folder holding one YYYY-MM-DD subfolder per day
    #[arg(long, default_value = "./logs")]
    logs_root: PathBuf,

    /// Which day to report on, counted back from today
    #[arg(long, default_value = "1")]
    days_back: u32,

    /// Only run folders whose name contains this
    #[arg(long, default_value = "delivery")]
    dir_contains: String,

    /// Only log files whose name contains this
    #[arg(long, default_value = "out")]
    file_contains: String,

    /// Removed from the run folder name to form the attachment name
    #[arg(long, default_value = "_delivery_options")]
    strip_suffix: String,

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

    let options = LogReportOptions {
        days_back: args.days_back,
        dir_contains: args.dir_contains,
        file_contains: args.file_contains,
        strip_suffix: args.strip_suffix,
    };
    let report = LogReport::new(&args.logs_root, Arc::new(notifier), options);
    let run = report.run(&args.mailto).await?;

    match args.format {
        OutputFormat::Json => print_json(&run)?,
        OutputFormat::Text => {
            for (name, path) in &run.attachments {
                println!("{} <- {}", name, path.display());
            }
            if run.sent {
                println!("Sent {} log file(s) to {}", run.attachments.len(), args.mailto);
            } else {
                println!("No log files found");
            }
        }
    }
    Ok(())
}
