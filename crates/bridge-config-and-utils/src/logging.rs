//! Logging initialization for the bridge.
//!
//! Delegates to the observability crate: structured JSONL goes to
//! `<base_dir>/logs/bridge.jsonl` and a compact stream goes to stderr.

use observability::LogConfig;
use std::path::Path;

const SERVICE_NAME: &str = "telemetry-bridge";

/// Initialize the logging system.
///
/// `level` is the default filter; `RUST_LOG` overrides it when set. When
/// `log_file` is `None` only stderr output is configured.
pub fn init_logging(level: &str, log_file: Option<&Path>) {
    observability::init_with_config(LogConfig {
        service_name: SERVICE_NAME.into(),
        default_level: level.into(),
        log_path: log_file.map(Path::to_path_buf),
        also_stderr: true,
    });
}
