//! Calibration store.
//!
//! One JSON document per label under `calibration_dir`:
//!
//! ```json
//! { "end_position_x": 120, "end_position_y": 80, "saved_at": "2026-03-01 09:12:44" }
//! ```
//!
//! Saving writes a temporary file in the same directory, syncs it and
//! renames it over the previous record, so a crash leaves either the old or
//! the new record and never a truncated one. Records are overwritten, never
//! merged.

use crate::cycle_log::timestamp_now;
use crate::error::CalibrationError;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

const FIELD_X: &str = "end_position_x";
const FIELD_Y: &str = "end_position_y";

/// A stored reference position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalibrationRecord {
    /// Record label (file stem).
    pub label: String,
    /// X position [steps].
    pub x: i64,
    /// Y position [steps].
    pub y: i64,
    /// Local save time, absent in records written by hand.
    pub saved_at: Option<String>,
}

#[derive(Serialize)]
struct StoredRecord<'a> {
    end_position_x: i64,
    end_position_y: i64,
    saved_at: &'a str,
}

/// Durable label -> (x, y) store.
#[derive(Debug, Clone)]
pub struct CalibrationStore {
    dir: PathBuf,
}

impl CalibrationStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the records.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File of the record `label`.
    pub fn path(&self, label: &str) -> PathBuf {
        self.dir.join(format!("{label}.json"))
    }

    /// Atomically replace the record `label` with `(x, y)`.
    pub fn save(&self, label: &str, x: i64, y: i64) -> io::Result<()> {
        validate_label(label)?;
        fs::create_dir_all(&self.dir)?;

        let saved_at = timestamp_now();
        let body = serde_json::to_vec_pretty(&StoredRecord {
            end_position_x: x,
            end_position_y: y,
            saved_at: &saved_at,
        })
        .map_err(io::Error::other)?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&body)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path(label)).map_err(|e| e.error)?;

        info!("Calibration '{}' saved: x={} y={}", label, x, y);
        Ok(())
    }

    /// Read the record `label`.
    pub fn load(&self, label: &str) -> Result<CalibrationRecord, CalibrationError> {
        let path = self.path(label);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CalibrationError::NotFound(label.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let malformed = |detail: String| CalibrationError::Malformed {
            label: label.to_string(),
            detail,
        };
        let doc: Value = serde_json::from_str(&content).map_err(|e| malformed(e.to_string()))?;
        let Value::Object(fields) = doc else {
            return Err(malformed("expected a JSON object".to_string()));
        };

        let coordinate = |field: &'static str| -> Result<i64, CalibrationError> {
            match fields.get(field) {
                None | Some(Value::Null) => Err(CalibrationError::MissingField {
                    label: label.to_string(),
                    field,
                }),
                Some(value) => value
                    .as_i64()
                    .ok_or_else(|| malformed(format!("{field} is not an integer: {value}"))),
            }
        };
        let x = coordinate(FIELD_X)?;
        let y = coordinate(FIELD_Y)?;
        let saved_at = fields
            .get("saved_at")
            .and_then(Value::as_str)
            .map(str::to_string);

        debug!("Calibration '{}' loaded from {}", label, path.display());
        Ok(CalibrationRecord {
            label: label.to_string(),
            x,
            y,
            saved_at,
        })
    }
}

fn validate_label(label: &str) -> io::Result<()> {
    let valid = !label.is_empty()
        && label != "."
        && label != ".."
        && !label.contains(['/', '\\', '\0']);
    if valid {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid calibration label {label:?}"),
        ))
    }
}
