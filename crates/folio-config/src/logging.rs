//! Logging initialization.
//!
//! Thin mapping from [`Config`](crate::Config) and [`Paths`] onto the
//! observability crate.

use crate::Paths;
use observability::LogConfig;

const ENV_LOG_STDERR: &str = "FOLIO_LOG_STDERR";

/// Initialize logging for a Folio service.
///
/// Events go to `~/.folio/logs/folio.jsonl` as JSON lines; set
/// `FOLIO_LOG_STDERR=1` to mirror them on stderr. `RUST_LOG` overrides
/// `level`.
pub fn init_logging(service_name: &str, level: &str, paths: &Paths) {
    let also_stderr = std::env::var(ENV_LOG_STDERR)
        .map(|raw| matches!(raw.trim(), "1" | "true" | "yes"))
        .unwrap_or(false);

    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: parse_level(level).to_string().to_ascii_lowercase(),
        log_path: Some(paths.log_file()),
        also_stderr,
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
