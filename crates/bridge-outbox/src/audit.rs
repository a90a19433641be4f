//! Append-only audit log of delivery attempts.
//!
//! One JSON object per line:
//! `{"timestamp": "...Z", "event_id": 12, "status": "RETRY_2"}`.

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

/// Outcome of one delivery attempt as written to the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum DeliveryStatus {
    /// Delivered; the record was removed.
    Success,
    /// Failed attempt `n`; the record stays queued with `retries = n`.
    Retry(u32),
    /// Retry budget exhausted; the record was dropped.
    FailedMaxRetries,
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("SUCCESS"),
            Self::Retry(n) => write!(f, "RETRY_{}", n),
            Self::FailedMaxRetries => f.write_str("FAILED_MAX_RETRIES"),
        }
    }
}

impl FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(Self::Success),
            "FAILED_MAX_RETRIES" => Ok(Self::FailedMaxRetries),
            other => other
                .strip_prefix("RETRY_")
                .and_then(|n| n.parse::<u32>().ok())
                .map(Self::Retry)
                .ok_or_else(|| format!("unknown delivery status '{}'", other)),
        }
    }
}

impl From<DeliveryStatus> for String {
    fn from(status: DeliveryStatus) -> Self {
        status.to_string()
    }
}

impl TryFrom<String> for DeliveryStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One line of the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: String,
    pub event_id: i64,
    pub status: DeliveryStatus,
}

/// JSONL audit log. Writes are best effort.
pub struct AuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry stamped with the current UTC time.
    ///
    /// Failures are logged and swallowed; the queue mutation this entry
    /// describes has already happened and must not be undone.
    pub fn record(&self, event_id: i64, status: DeliveryStatus) {
        let entry = AuditEntry {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            event_id,
            status,
        };

        if let Err(e) = self.append(&entry) {
            warn!(
                path = %self.path.display(),
                event_id,
                status = %status,
                error = %e,
                "Failed to write audit entry"
            );
        }
    }

    fn append(&self, entry: &AuditEntry) -> io::Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        // Single write per line keeps entries whole under concurrent appends.
        file.write_all(line.as_bytes())
    }

    /// Read all entries in insertion order.
    ///
    /// A missing file yields no entries. Lines that fail to parse are skipped.
    pub fn read_entries(&self) -> io::Result<Vec<AuditEntry>> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut entries = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(line = index + 1, error = %e, "Skipping corrupt audit entry"),
            }
        }
        Ok(entries)
    }
}
