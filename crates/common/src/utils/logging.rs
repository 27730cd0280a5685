use std::io;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info,tower_http=info,axum=info";

fn filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Compact human-readable logs on stdout. `RUST_LOG` overrides the default filter.
pub fn init_logging_default() {
    let _ = fmt()
        .with_env_filter(filter_or(DEFAULT_FILTER))
        .with_target(false)
        .compact()
        .with_writer(io::stdout)
        .try_init();
}

/// One JSON object per event, for log shippers.
pub fn init_logging_json() {
    // Xero 同步流程默认 debug 级别，便于排查远端接口问题；可通过 RUST_LOG 覆盖
    let _ = fmt()
        .with_env_filter(filter_or("info,service::xero=debug"))
        .with_target(true)
        .json()
        .with_current_span(true)
        .with_writer(io::stdout)
        .try_init();
}

/// Pick the subscriber flavour from `server.log_format` (`json`, anything else is compact).
pub fn init_logging_with_format(format: &str) {
    match format.trim().to_ascii_lowercase().as_str() {
        "json" => init_logging_json(),
        _ => init_logging_default(),
    }
}
