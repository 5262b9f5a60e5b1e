//! Prelude module for common re-exports.
//!
//! This module provides convenient re-exports of commonly used types
//! so that consumers can do `use gantry_common::prelude::*;` and get
//! the most important types without listing individual paths.

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, GantryConfig, LogLevel, SharedConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::AXIS_COUNT;

// ─── Hardware ───────────────────────────────────────────────────────
pub use crate::hal::driver::{AxisDriver, EdgeHandler, EndstopSensor, HalError};
pub use crate::hal::types::{Axis, Direction, EndstopEdge, StepMode, StepModeControl};

// ─── Motion ─────────────────────────────────────────────────────────
pub use crate::motion::command::{IntentKind, MotionCommand, MotionIntent};
