//! # Observability
//!
//! Tracing setup for every crate in the edge delivery workspace.
//!
//! Library crates only emit events through `tracing` macros (`info!`,
//! `warn!`, ...) with structured fields such as `request_id` or `entity_id`.
//! Exactly one place in a process installs the subscriber, by calling
//! [`init`] or [`init_with_config`] at startup.
//!
//! With the `jsonl` feature (default) events are appended as one JSON object
//! per line to `~/.edge/logs/edge.jsonl`:
//!
//! ```text
//! {"timestamp":"..","level":"WARN","service":"edge","pid":4242,
//!  "target":"edge_delivery::hit_processor","message":"Hit send failed, will retry",
//!  "fields":{"request_id":"..","retry_in_ms":5000}}
//! ```
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "edge".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! });
//! tracing::info!("pipeline started");
//! ```

#[cfg(feature = "jsonl")]
mod file_writer;
#[cfg(feature = "jsonl")]
mod json_layer;

use std::path::PathBuf;

#[cfg(feature = "jsonl")]
pub use json_layer::LogEntry;

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, written into every JSONL line.
    pub service_name: String,

    /// Default filter directive (e.g. "info", "edge_delivery=debug").
    /// `RUST_LOG` takes precedence when set.
    pub default_level: String,

    /// Custom log file path. Defaults to `~/.edge/logs/edge.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit compact human-readable lines to stderr.
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

/// Initialize logging with defaults for `service_name`.
///
/// A second call in the same process is a no-op. If the log file cannot be
/// opened, events go to stderr instead.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize logging with a custom configuration.
pub fn init_with_config(config: LogConfig) {
    #[cfg(feature = "jsonl")]
    {
        file_writer::init_jsonl_subscriber(&config);
    }

    #[cfg(not(feature = "jsonl"))]
    {
        use tracing_subscriber::util::SubscriberInitExt;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.default_level)),
            )
            .with_target(true)
            .compact()
            .finish()
            .try_init();
    }
}

/// Parse a level name into a tracing `Level`, defaulting to INFO.
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

pub use tracing::{debug, error, info, instrument, span, trace, warn, Level};
