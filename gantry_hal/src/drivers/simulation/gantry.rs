//! Shared carriage model of the simulated gantry.
//!
//! Each carriage position is kept as the physical distance from its minimum
//! switch in steps. Stepping in the axis's `limit_direction` decreases the
//! distance; the switch is closed at or below zero and a hard stop clamps
//! the carriage `overtravel_steps` beyond the switch.

use gantry_common::hal::config::MachineConfig;
use gantry_common::hal::driver::HalError;
use gantry_common::hal::types::{Axis, Direction};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{trace, warn};

#[derive(Debug, Clone)]
struct Carriage {
    limit_direction: Direction,
    distance: i64,
    overtravel: i64,
    stalled_steps: u64,
    fault_pending: bool,
}

impl Carriage {
    fn apply(&mut self, axis: Axis, direction: Direction, count: u32) -> Result<(), HalError> {
        if self.fault_pending {
            self.fault_pending = false;
            return Err(HalError::StepFailed(format!("simulated fault on axis {axis}")));
        }

        let count = i64::from(count);
        if direction == self.limit_direction {
            let target = self.distance - count;
            let floor = -self.overtravel;
            if target < floor {
                let lost = (floor - target) as u64;
                self.stalled_steps += lost;
                if self.stalled_steps == lost {
                    warn!("Simulated axis {} hit the hard stop", axis);
                }
                self.distance = floor;
            } else {
                self.distance = target;
            }
        } else {
            self.distance += count;
        }
        trace!("Simulated axis {} carriage at {}", axis, self.distance);
        Ok(())
    }
}

/// Carriage model shared by the simulated drivers and switches.
#[derive(Debug, Clone)]
pub struct SimulatedGantry {
    carriages: Arc<Mutex<[Carriage; 2]>>,
}

impl SimulatedGantry {
    /// Build the model from the machine configuration.
    pub fn new(config: &MachineConfig) -> Self {
        let carriage = |axis: Axis| Carriage {
            limit_direction: config.axis(axis).limit_direction,
            distance: config.simulation.start_offset(axis),
            overtravel: config.simulation.overtravel_steps,
            stalled_steps: 0,
            fault_pending: false,
        };
        Self {
            carriages: Arc::new(Mutex::new([carriage(Axis::X), carriage(Axis::Y)])),
        }
    }

    /// Distance of the carriage from its switch [steps].
    pub fn distance(&self, axis: Axis) -> i64 {
        self.carriages.lock()[axis.index()].distance
    }

    /// Teleport the carriage (test setup).
    pub fn set_distance(&self, axis: Axis, distance: i64) {
        self.carriages.lock()[axis.index()].distance = distance;
    }

    /// Whether the minimum switch is physically closed.
    pub fn switch_closed(&self, axis: Axis) -> bool {
        self.distance(axis) <= 0
    }

    /// Steps swallowed by the hard stop so far.
    pub fn stalled_steps(&self, axis: Axis) -> u64 {
        self.carriages.lock()[axis.index()].stalled_steps
    }

    /// Make the next burst on `axis` fail without moving.
    pub fn inject_step_fault(&self, axis: Axis) {
        self.carriages.lock()[axis.index()].fault_pending = true;
    }

    /// Move the carriage by one burst.
    pub fn apply(&self, axis: Axis, direction: Direction, count: u32) -> Result<(), HalError> {
        self.carriages.lock()[axis.index()].apply(axis, direction, count)
    }
}
