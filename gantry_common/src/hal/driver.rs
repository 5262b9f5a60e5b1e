//! HAL capability traits and error types.
//!
//! This module defines:
//! - `AxisDriver` trait - Step emission for one axis
//! - `EndstopSensor` trait - Debounced limit switch exposing edge events
//! - `HalError` enum - Error types for HAL operations
//! - `EdgeHandler` type alias - Callback installed on an endstop sensor

use crate::hal::types::{Direction, EndstopEdge, StepMode};
use thiserror::Error;

/// Error types for HAL operations.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// Pin or driver bring-up failed (fatal at startup).
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Hardware communication error
    #[error("Hardware communication error: {0}")]
    CommunicationError(String),

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// A step burst could not be emitted
    #[error("Step emission failed: {0}")]
    StepFailed(String),
}

/// Callback invoked by an endstop sensor on every debounced edge.
///
/// Runs on the sensor's own context and must not block.
pub type EdgeHandler = Box<dyn Fn(EndstopEdge) + Send + Sync>;

/// Trait defining the step-emission primitive of one axis.
///
/// The motion scheduler is the only caller of [`AxisDriver::step`]; every
/// other context submits motion commands instead.
///
/// # Lifecycle
///
/// 1. `configure()` - Called once at bring-up
/// 2. `step()` - Called by the scheduler once per tick with a bounded burst
/// 3. `disable()` - De-energises the motor; a later `step()` re-enables it
pub trait AxisDriver: Send {
    /// Returns the driver's identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Apply the micro-step mode.
    ///
    /// # Errors
    /// Return `HalError::InitFailed` if the mode pins cannot be driven.
    fn configure(&mut self, mode: StepMode) -> Result<(), HalError>;

    /// Emit `count` step pulses in `direction`.
    ///
    /// Returns only after the pulses were emitted. A returned error means
    /// no pulse of the burst may be assumed executed.
    fn step(&mut self, direction: Direction, count: u32) -> Result<(), HalError>;

    /// De-energise the motor.
    fn disable(&mut self) -> Result<(), HalError>;

    /// Monotonic count of all pulses emitted since bring-up.
    fn step_count(&self) -> u64;

    /// Whether the motor is currently energised.
    fn is_enabled(&self) -> bool;
}

/// Trait for a debounced limit switch.
///
/// Implementations deliver edges to the installed handler from their own
/// context (interrupt-style). Only stable transitions are reported.
pub trait EndstopSensor: Send {
    /// Install the edge handler, replacing any previous one.
    ///
    /// # Errors
    /// Return `HalError::InitFailed` if edge detection cannot be started.
    fn on_edge(&mut self, handler: EdgeHandler) -> Result<(), HalError>;

    /// Current debounced state (polling capability).
    fn is_pressed(&self) -> bool;

    /// Stop edge detection and release the input.
    fn close(&mut self) -> Result<(), HalError>;
}
