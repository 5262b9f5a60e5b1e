//! Simulated limit switch input.

use super::gantry::SimulatedGantry;
use crate::endstop::RawInput;
use gantry_common::hal::driver::HalError;
use gantry_common::hal::types::Axis;

/// Raw switch level derived from the carriage model and the wiring polarity.
pub struct SimulatedSwitch {
    axis: Axis,
    gantry: SimulatedGantry,
    active_high: bool,
}

impl SimulatedSwitch {
    /// Switch of `axis`; `active_high` selects the level of a closed switch.
    pub fn new(axis: Axis, gantry: SimulatedGantry, active_high: bool) -> Self {
        Self {
            axis,
            gantry,
            active_high,
        }
    }
}

impl RawInput for SimulatedSwitch {
    fn read(&self) -> Result<bool, HalError> {
        let closed = self.gantry.switch_closed(self.axis);
        Ok(closed == self.active_high)
    }
}
