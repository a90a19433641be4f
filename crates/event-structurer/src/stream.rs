//! Local event stream file.

use bridge_outbox::EventPacket;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// JSONL copy of structured packets for local inspection.
///
/// Independent of the delivery queue; a failed append never blocks a packet
/// from reaching the bridge.
pub struct EventStream {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl EventStream {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `packet` as one line. Failures are logged and swallowed.
    pub fn append(&self, packet: &EventPacket) {
        if let Err(e) = self.try_append(packet) {
            warn!(path = %self.path.display(), error = %e, "Skipping event stream write");
        }
    }

    fn try_append(&self, packet: &EventPacket) -> io::Result<()> {
        let mut line = serde_json::to_string(packet)?;
        line.push('\n');

        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?
            .write_all(line.as_bytes())
    }
}
