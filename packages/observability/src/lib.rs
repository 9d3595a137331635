//! # Observability
//!
//! Logging setup shared by every Folio crate.
//!
//! Crates are **log producers** only. The binary calls [`init`] or
//! [`init_with_config`] once at startup and the rest of the code uses the
//! standard `tracing` macros with structured fields:
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init("cli");
//!     tracing::info!(status = "anonymous", "session bootstrapped");
//! }
//! ```
//!
//! When a log file is configured, every event is written as one JSON line to
//! that file (`~/.folio/logs/folio.jsonl` by default). Fields whose names look
//! like credentials (`password`, `access_token`, ...) are redacted before they
//! reach the file.

mod json_layer;
mod writer;

use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub use json_layer::{is_secret_field, JsonLayer, LogEntry, REDACTED};
pub use writer::{LogFileWriter, WriterFactory};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g., "cli"). Included in every log line.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by the `RUST_LOG` environment variable.
    pub default_level: String,

    /// JSONL log file. `None` disables the file layer.
    pub log_path: Option<PathBuf>,

    /// Also emit compact human-readable logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Default JSONL log location (`~/.folio/logs/folio.jsonl`).
pub fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".folio").join("logs").join("folio.jsonl"))
}

/// Initialize logging with default settings and the default log file.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        log_path: default_log_path(),
        ..Default::default()
    });
}

/// Initialize logging with custom configuration.
///
/// A log file that cannot be opened is reported on stderr and logging falls
/// back to stderr only; it never aborts the process. Calling this twice is a
/// no-op for the second call.
pub fn init_with_config(config: LogConfig) {
    let file_layer = config.log_path.as_ref().and_then(|path| {
        match LogFileWriter::new(path) {
            Ok(writer) => Some(
                JsonLayer::new(config.service_name.clone(), WriterFactory::new(writer))
                    .with_filter(env_filter(&config.default_level)),
            ),
            Err(e) => {
                eprintln!("failed to open log file {}: {}", path.display(), e);
                None
            }
        }
    });

    // Without a file there is nowhere else for events to go.
    let stderr_enabled = config.also_stderr || file_layer.is_none();
    let stderr_layer = stderr_enabled.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(env_filter(&config.default_level))
    });

    let installed = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(
            service = %config.service_name,
            log_path = ?config.log_path,
            "observability initialized"
        );
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;
