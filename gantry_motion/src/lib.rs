//! # Gantry Motion Core
//!
//! Motion coordinator of the two-axis wash gantry.
//!
//! ## Execution Contexts
//!
//! ```text
//!  operator / wash cycle ──MotionCommand──► IntentRegister ◄──StopAll── endstop edge
//!                                                │                          │
//!                                           snapshot/tick            BackoffRequest
//!                                                ▼                          ▼
//!                              MotionScheduler (single thread) ◄── BackoffController
//!                                                │
//!                                     AxisDriver::step (X, Y)
//! ```
//!
//! - The scheduler thread is the only caller of `AxisDriver::step` and the
//!   only writer of the position counters.
//! - Endstop handlers never block: they flip flags, apply `StopAll` and
//!   enqueue a back-off.
//! - Back-off motion goes through the intent register like any other
//!   motion.
//!
//! ## Module Structure
//!
//! - [`intent`] - Intent register
//! - [`endstop`] / [`backoff`] - Endstop flags and automatic back-off
//! - [`scheduler`] - Tick loop
//! - [`state`] - State shared between the contexts
//! - [`homing`] - Homing state machine and protocol
//! - [`calibration`] / [`cycle_log`] - Persistence
//! - [`coordinator`] - Operations used by the CLI and the wash cycle
//! - [`wash`] - Wash-cycle orchestrator
//! - [`error`] - Error types

#![warn(missing_docs)]

pub mod backoff;
pub mod calibration;
pub mod coordinator;
pub mod cycle_log;
pub mod endstop;
pub mod error;
pub mod homing;
pub mod intent;
pub mod scheduler;
pub mod state;
pub mod wash;

pub use crate::calibration::{CalibrationRecord, CalibrationStore};
pub use crate::coordinator::{AxisStatus, MotionCoordinator, MotionStatus};
pub use crate::cycle_log::{CycleOutcome, WorkCycleLog, WorkCycleLogEntry};
pub use crate::error::{CalibrationError, CycleError, HomingError, MotionError};
pub use crate::scheduler::{MotionScheduler, SchedulerStats};
pub use crate::state::SharedMotionState;
pub use crate::wash::{CycleReport, GantryMotion, WashCycleOrchestrator, WashStep};
