//! Append-only work-cycle log (one JSON object per line).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Local wall-clock time in log format.
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Every step ran.
    Completed,
    /// Aborted with a reason.
    Aborted(String),
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::Completed => f.write_str("completed"),
            CycleOutcome::Aborted(reason) => write!(f, "aborted: {reason}"),
        }
    }
}

/// One log line. Never mutated after append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCycleLogEntry {
    /// Cycle start (local time).
    pub start_time: String,
    /// Cycle end (local time).
    pub end_time: String,
    /// `completed` or `aborted: <reason>`.
    pub outcome: String,
}

impl WorkCycleLogEntry {
    /// Build an entry from its parts.
    pub fn new(start_time: String, end_time: String, outcome: &CycleOutcome) -> Self {
        Self {
            start_time,
            end_time,
            outcome: outcome.to_string(),
        }
    }
}

/// JSON-lines log file.
#[derive(Debug, Clone)]
pub struct WorkCycleLog {
    path: PathBuf,
}

impl WorkCycleLog {
    /// Log stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry.
    pub fn append(&self, entry: &WorkCycleLogEntry) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut line = serde_json::to_string(entry).map_err(io::Error::other)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.sync_data()
    }

    /// All entries, oldest first. A missing file is an empty log; lines
    /// that do not parse are skipped.
    pub fn entries(&self) -> io::Result<Vec<WorkCycleLogEntry>> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut entries = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("{}:{}: skipping log line: {}", self.path.display(), n + 1, e),
            }
        }
        Ok(entries)
    }
}
