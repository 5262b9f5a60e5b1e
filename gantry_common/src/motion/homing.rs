//! Homing configuration.
//!
//! The axis order is installation dependent (carriage geometry decides which
//! axis must clear first), so it is configured rather than hard-coded.

use crate::consts::{DEFAULT_HOMING_MAX_TRAVEL_STEPS, DEFAULT_HOMING_TIMEOUT_MS};
use crate::hal::types::Axis;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_order() -> Vec<Axis> {
    vec![Axis::Y, Axis::X]
}

fn default_timeout_ms() -> u64 {
    DEFAULT_HOMING_TIMEOUT_MS
}

fn default_max_travel_steps() -> u64 {
    DEFAULT_HOMING_MAX_TRAVEL_STEPS
}

/// `[homing]` configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HomingConfig {
    /// Axes in the order they are driven to their endstops.
    #[serde(default = "default_order")]
    pub order: Vec<Axis>,

    /// Upper bound of every homing phase [ms].
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Upper bound of the travel of one approach [steps].
    #[serde(default = "default_max_travel_steps")]
    pub max_travel_steps: u64,
}

impl HomingConfig {
    /// Phase timeout as Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validates the order (every axis exactly once) and the bounds.
    pub fn validate(&self) -> Result<(), String> {
        for axis in Axis::ALL {
            let count = self.order.iter().filter(|a| **a == axis).count();
            if count != 1 {
                return Err(format!(
                    "homing.order must list axis {axis} exactly once (found {count})"
                ));
            }
        }
        if self.timeout_ms == 0 {
            return Err("homing.timeout_ms must be greater than 0".to_string());
        }
        if self.max_travel_steps == 0 {
            return Err("homing.max_travel_steps must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            order: default_order(),
            timeout_ms: DEFAULT_HOMING_TIMEOUT_MS,
            max_travel_steps: DEFAULT_HOMING_MAX_TRAVEL_STEPS,
        }
    }
}
