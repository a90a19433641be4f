//! File system paths for the bridge.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Directory name under the home directory.
const BASE_DIR_NAME: &str = ".telemetry-bridge";

/// Manages file system paths for the bridge.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for all bridge files (~/.telemetry-bridge)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.telemetry-bridge`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(BASE_DIR_NAME),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory.
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the default queue database path (bridge_buffer.db).
    pub fn database_file(&self) -> PathBuf {
        self.base_dir.join("bridge_buffer.db")
    }

    /// Get the default audit log path (integration_log.jsonl).
    pub fn audit_log_file(&self) -> PathBuf {
        self.base_dir.join("integration_log.jsonl")
    }

    /// Get the default event stream path (event_stream.jsonl).
    pub fn event_stream_file(&self) -> PathBuf {
        self.base_dir.join("event_stream.jsonl")
    }

    /// Get the logs directory.
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the structured log file path (logs/bridge.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("bridge.jsonl")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_paths_with_base_dir() {
        let base = PathBuf::from("/tmp/test-bridge");
        let paths = Paths::with_base_dir(base.clone());

        assert_eq!(paths.base_dir(), &base);
        assert_eq!(paths.config_file(), base.join("config.json"));
        assert_eq!(paths.database_file(), base.join("bridge_buffer.db"));
        assert_eq!(paths.audit_log_file(), base.join("integration_log.jsonl"));
        assert_eq!(paths.event_stream_file(), base.join("event_stream.jsonl"));
        assert_eq!(paths.logs_dir(), base.join("logs"));
        assert_eq!(paths.log_file(), base.join("logs/bridge.jsonl"));
    }

    #[test]
    fn test_paths_default() {
        let paths = Paths::new().unwrap();
        let home = dirs::home_dir().unwrap();

        assert_eq!(paths.base_dir(), &home.join(".telemetry-bridge"));
    }

    #[test]
    fn test_ensure_dirs_creates_directories() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("bridge");
        let paths = Paths::with_base_dir(base.clone());

        assert!(!base.exists());

        paths.ensure_dirs().unwrap();
        paths.ensure_dirs().unwrap();

        assert!(base.is_dir());
        assert!(paths.logs_dir().is_dir());
    }
}
