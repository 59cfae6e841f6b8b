//! Logging initialization for the pipeline.
//!
//! Thin wrappers over the observability crate. Structured JSONL goes to
//! `~/.edge/logs/edge.jsonl`; `RUST_LOG` overrides the level passed in.

use crate::Paths;

/// Initialize the logging system under the `edge` service name.
///
/// ```ignore
/// init_logging("info");
/// tracing::info!("pipeline started");
/// ```
pub fn init_logging(level: &str) {
    init_logging_for_service("edge", level);
}

/// Initialize logging with a custom service name.
///
/// Use this when several pipelines share one log stream and need to be
/// told apart.
pub fn init_logging_for_service(service_name: &str, level: &str) {
    let log_path = Paths::new().ok().map(|paths| paths.log_file());

    observability::init_with_config(observability::LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        log_path,
        also_stderr: stderr_enabled(),
    });
}

fn stderr_enabled() -> bool {
    std::env::var("EDGE_LOG_STDERR")
        .map(|raw| matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
