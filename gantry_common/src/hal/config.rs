//! HAL configuration types.
//!
//! This module contains configuration types for the hardware side:
//! - `MachineConfig` - `[machine]` table: backend selection and both axes
//! - `AxisConfig` / `EndstopConfig` - Per-axis driver and limit-switch setup
//! - `SimulationConfig` - Carriage model of the simulation backend
//! - `PeripheralConfig` - Serial link to the peripheral controller

use crate::consts::{
    DEFAULT_DEBOUNCE_MS, DEFAULT_ENDSTOP_POLL_US, DEFAULT_PERIPHERAL_BAUD,
    DEFAULT_PERIPHERAL_SETTLE_MS, DEFAULT_RESPONSE_WINDOW_MS, DEFAULT_STEP_DELAY_US,
};
use crate::hal::driver::HalError;
use crate::hal::types::{Axis, Direction, StepMode, StepModeControl};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_driver() -> String {
    "simulation".to_string()
}

fn default_limit_direction() -> Direction {
    Direction::Backward
}

fn default_step_delay_us() -> u64 {
    DEFAULT_STEP_DELAY_US
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_poll_interval_us() -> u64 {
    DEFAULT_ENDSTOP_POLL_US
}

fn default_start_offset() -> i64 {
    2_000
}

fn default_overtravel() -> i64 {
    400
}

fn default_baud_rate() -> u32 {
    DEFAULT_PERIPHERAL_BAUD
}

fn default_settle_ms() -> u64 {
    DEFAULT_PERIPHERAL_SETTLE_MS
}

fn default_response_window_ms() -> u64 {
    DEFAULT_RESPONSE_WINDOW_MS
}

/// `[machine]` configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MachineConfig {
    /// Registered backend name (e.g. "simulation").
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Horizontal axis.
    #[serde(default)]
    pub x: AxisConfig,

    /// Vertical axis.
    #[serde(default)]
    pub y: AxisConfig,

    /// Carriage model used by the simulation backend.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl MachineConfig {
    /// Configuration of the given axis.
    pub fn axis(&self, axis: Axis) -> &AxisConfig {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
        }
    }

    /// Validate the machine configuration.
    ///
    /// # Validation Rules
    /// 1. `driver` is not empty
    /// 2. Each endstop has a debounce interval longer than its poll period
    /// 3. Simulation overtravel is not negative
    pub fn validate(&self) -> Result<(), HalError> {
        if self.driver.trim().is_empty() {
            return Err(HalError::ConfigError(
                "machine.driver cannot be empty".to_string(),
            ));
        }

        for axis in Axis::ALL {
            self.axis(axis)
                .validate()
                .map_err(|e| HalError::ConfigError(format!("machine.{axis}: {e}")))?;
        }

        if self.simulation.overtravel_steps < 0 {
            return Err(HalError::ConfigError(format!(
                "machine.simulation.overtravel_steps must not be negative (got {})",
                self.simulation.overtravel_steps
            )));
        }

        Ok(())
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            x: AxisConfig::default(),
            y: AxisConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

/// Per-axis driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisConfig {
    /// Micro-step resolution.
    #[serde(default)]
    pub step_mode: StepMode,

    /// Whether the mode pins are driven from software.
    #[serde(default)]
    pub step_mode_control: StepModeControl,

    /// Direction that travels toward the minimum endstop.
    /// Wiring dependent; fix against the actual installation.
    #[serde(default = "default_limit_direction")]
    pub limit_direction: Direction,

    /// Half period of one step pulse [µs].
    #[serde(default = "default_step_delay_us")]
    pub step_delay_us: u64,

    /// Minimum endstop of this axis.
    #[serde(default)]
    pub endstop: EndstopConfig,
}

impl AxisConfig {
    /// Direction that moves the carriage away from the minimum endstop.
    #[inline]
    pub fn away_direction(&self) -> Direction {
        self.limit_direction.opposite()
    }

    /// Step pulse half period as Duration.
    pub fn step_delay(&self) -> Duration {
        Duration::from_micros(self.step_delay_us)
    }

    fn validate(&self) -> Result<(), String> {
        self.endstop.validate()
    }
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            step_mode: StepMode::default(),
            step_mode_control: StepModeControl::default(),
            limit_direction: default_limit_direction(),
            step_delay_us: DEFAULT_STEP_DELAY_US,
            endstop: EndstopConfig::default(),
        }
    }
}

/// Endstop input configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndstopConfig {
    /// Raw level that means "pressed". `true` for a switch pulling the
    /// input high (pull-down wiring), `false` for pull-up wiring.
    #[serde(default = "default_true")]
    pub active_high: bool,

    /// Raw transitions shorter than this are discarded [ms].
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Sampling period of the input [µs].
    #[serde(default = "default_poll_interval_us")]
    pub poll_interval_us: u64,
}

impl EndstopConfig {
    /// Debounce interval as Duration.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Poll period as Duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us)
    }

    fn validate(&self) -> Result<(), String> {
        if self.poll_interval_us == 0 {
            return Err("endstop.poll_interval_us must be greater than 0".to_string());
        }
        if self.debounce_ms * 1000 < self.poll_interval_us {
            return Err(format!(
                "endstop.debounce_ms ({} ms) is shorter than the poll period ({} us)",
                self.debounce_ms, self.poll_interval_us
            ));
        }
        Ok(())
    }
}

impl Default for EndstopConfig {
    fn default() -> Self {
        Self {
            active_high: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            poll_interval_us: DEFAULT_ENDSTOP_POLL_US,
        }
    }
}

/// Carriage model of the simulation backend.
///
/// Positions are physical steps measured from each switch; the switch is
/// closed at or below zero and the hard stop sits `overtravel_steps` below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Initial distance of the X carriage from its switch [steps].
    #[serde(default = "default_start_offset")]
    pub start_offset_x: i64,

    /// Initial distance of the Y carriage from its switch [steps].
    #[serde(default = "default_start_offset")]
    pub start_offset_y: i64,

    /// Travel past the switch before the mechanical hard stop [steps].
    #[serde(default = "default_overtravel")]
    pub overtravel_steps: i64,
}

impl SimulationConfig {
    /// Initial carriage offset of the given axis.
    pub fn start_offset(&self, axis: Axis) -> i64 {
        match axis {
            Axis::X => self.start_offset_x,
            Axis::Y => self.start_offset_y,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_offset_x: default_start_offset(),
            start_offset_y: default_start_offset(),
            overtravel_steps: default_overtravel(),
        }
    }
}

/// `[peripheral]` configuration: serial link to the pump/rotation controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeripheralConfig {
    /// Serial device (e.g. "/dev/ttyUSB0"). `None` selects the simulated link.
    #[serde(default)]
    pub port: Option<String>,

    /// Baud rate.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Delay after opening the port before the first command [ms].
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Window during which response lines are collected [ms].
    #[serde(default = "default_response_window_ms")]
    pub response_window_ms: u64,
}

impl PeripheralConfig {
    /// Settle delay as Duration.
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Response window as Duration.
    pub fn response_window(&self) -> Duration {
        Duration::from_millis(self.response_window_ms)
    }

    /// Validate the peripheral configuration.
    pub fn validate(&self) -> Result<(), HalError> {
        if self.baud_rate == 0 {
            return Err(HalError::ConfigError(
                "peripheral.baud_rate must be greater than 0".to_string(),
            ));
        }
        if let Some(port) = &self.port {
            if port.trim().is_empty() {
                return Err(HalError::ConfigError(
                    "peripheral.port cannot be empty when set".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for PeripheralConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_PERIPHERAL_BAUD,
            settle_ms: DEFAULT_PERIPHERAL_SETTLE_MS,
            response_window_ms: DEFAULT_RESPONSE_WINDOW_MS,
        }
    }
}
