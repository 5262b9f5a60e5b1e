//! Error types of the motion core.
//!
//! - `HomingError` - Homing did not reach its reference
//! - `MotionError` - Absolute/relative moves and scheduler control
//! - `CalibrationError` - Reading a calibration record
//! - `CycleError` - Wash-cycle failures, wrapping the above

use crate::homing::HomingPhase;
use gantry_common::hal::driver::HalError;
use gantry_common::hal::types::Axis;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Bound exceeded by a homing phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingLimit {
    /// Phase took longer than the configured timeout.
    Elapsed(Duration),
    /// Carriage travelled more than the configured step budget.
    Travel(u64),
}

impl fmt::Display for HomingLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HomingLimit::Elapsed(d) => write!(f, "no progress within {} ms", d.as_millis()),
            HomingLimit::Travel(steps) => write!(f, "travelled more than {steps} steps"),
        }
    }
}

/// Homing failures. The position is unknown afterwards.
#[derive(Debug, Clone, Error)]
pub enum HomingError {
    /// A phase exceeded its time or travel bound.
    #[error("Homing timeout on axis {axis} during {phase}: {limit}")]
    Timeout {
        /// Axis being homed.
        axis: Axis,
        /// Phase that did not finish.
        phase: HomingPhase,
        /// Bound that was exceeded.
        limit: HomingLimit,
    },

    /// The motion scheduler is not running.
    #[error("Motion scheduler is not running")]
    NotRunning,

    /// A step burst failed.
    #[error("Hardware error during homing: {0}")]
    Hal(#[from] HalError),
}

/// Motion failures.
#[derive(Debug, Clone, Error)]
pub enum MotionError {
    /// Absolute moves need a completed `home()`.
    #[error("Axes are not referenced, home first")]
    NotReferenced,

    /// The motion scheduler is not running.
    #[error("Motion scheduler is not running")]
    NotRunning,

    /// The move was stopped before reaching its target.
    #[error("Motion aborted: {0}")]
    Aborted(String),

    /// A step burst failed or the hardware could not be driven.
    #[error("Hardware error: {0}")]
    Hal(#[from] HalError),
}

/// Calibration record read failures.
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// No record stored under this label.
    #[error("Calibration '{0}' not found")]
    NotFound(String),

    /// The record exists but is not a valid document.
    #[error("Calibration '{label}' is malformed: {detail}")]
    Malformed {
        /// Record label.
        label: String,
        /// Parser message or offending field.
        detail: String,
    },

    /// A required field is absent.
    #[error("Calibration '{label}' is missing field '{field}'")]
    MissingField {
        /// Record label.
        label: String,
        /// Name of the missing field.
        field: &'static str,
    },

    /// The record could not be read.
    #[error("Calibration I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wash-cycle failures.
#[derive(Debug, Error)]
pub enum CycleError {
    /// A cycle is already in progress.
    #[error("A wash cycle is already running")]
    AlreadyRunning,

    /// Calibration preflight failed; no motion was issued.
    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    /// Homing failed.
    #[error(transparent)]
    Homing(#[from] HomingError),

    /// A move failed.
    #[error(transparent)]
    Motion(#[from] MotionError),

    /// A peripheral command could not be delivered.
    #[error("Peripheral error: {0}")]
    Peripheral(#[from] HalError),
}
