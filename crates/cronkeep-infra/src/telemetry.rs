use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for a job binary.
///
/// `RUST_LOG` overrides the default filter. Set `LOG_FORMAT=json` for
/// line-delimited JSON, which is easier to ship from cron mail or syslog.
pub fn init_telemetry(service_name: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            "warn,cronkeep_cli=info,cronkeep_services=info,cronkeep_infra=info,cronkeep_storage=info",
        )
    });

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    if result.is_ok() {
        tracing::debug!(service = %service_name, "Tracing initialized");
    }
}
