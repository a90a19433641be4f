//! Configuration, file-system layout and logging setup for the telemetry bridge.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    BackoffKind, Config, DEFAULT_ENDPOINT_URL, DEFAULT_LOG_LEVEL, DEFAULT_MAX_RETRIES,
    DEFAULT_REQUEST_TIMEOUT_SECONDS, DEFAULT_RETRY_DELAY_SECONDS,
};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use paths::Paths;
