//! Shared helpers for the cronkeep job binaries.

use clap::ValueEnum;
use cronkeep_core::AppError;
use serde::Serialize;

/// How a binary reports its run summary on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing(binary: &str) {
    cronkeep_infra::init_telemetry(binary);
}

/// Print `value` as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Log a failed run with its full error chain and hand the error back so
/// `main` exits non-zero.
pub fn log_failure(binary: &str, result: anyhow::Result<()>) -> anyhow::Result<()> {
    if let Err(ref e) = result {
        let (error_code, transient) = failure_kind(e);
        tracing::error!(
            binary = %binary,
            error_code,
            transient,
            error = %format!("{:#}", e),
            "Run failed"
        );
    }
    result
}

/// Code and retry hint of the first `AppError` in the chain.
pub fn failure_kind(error: &anyhow::Error) -> (&'static str, bool) {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<AppError>())
        .map(|app| (app.error_code(), app.is_transient()))
        .unwrap_or(("INTERNAL_ERROR", false))
}

/// `1536` -> `1.50 KiB`
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}
