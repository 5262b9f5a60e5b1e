//! Simulation backend.
//!
//! Software model of the gantry for development and testing without
//! physical hardware: two [`SimulatedAxis`] drivers and two switches share
//! one [`SimulatedGantry`] carriage model, and the switches are sampled by
//! the regular [`PolledEndstop`](crate::endstop::PolledEndstop).

mod axis;
mod gantry;
mod switch;

pub use axis::SimulatedAxis;
pub use gantry::SimulatedGantry;
pub use switch::SimulatedSwitch;

use crate::driver_registry::{AxisHardware, Hardware};
use crate::endstop::PolledEndstop;
use gantry_common::hal::config::MachineConfig;
use gantry_common::hal::driver::HalError;
use gantry_common::hal::types::Axis;
use tracing::info;

impl SimulatedGantry {
    /// Build drivers and endstops of both axes on this model.
    pub fn hardware(&self, config: &MachineConfig) -> Hardware {
        let axis = |axis: Axis| {
            let axis_config = config.axis(axis);
            AxisHardware {
                driver: Box::new(SimulatedAxis::new(axis, self.clone(), axis_config)),
                endstop: Box::new(PolledEndstop::new(
                    axis,
                    Box::new(SimulatedSwitch::new(
                        axis,
                        self.clone(),
                        axis_config.endstop.active_high,
                    )),
                    axis_config.endstop.clone(),
                )),
            }
        };
        Hardware {
            x: axis(Axis::X),
            y: axis(Axis::Y),
        }
    }
}

/// `BackendFactory` of the simulation backend.
pub fn create_hardware(config: &MachineConfig) -> Result<Hardware, HalError> {
    info!(
        "Simulated carriages start {} / {} steps from their switches",
        config.simulation.start_offset_x, config.simulation.start_offset_y
    );
    Ok(SimulatedGantry::new(config).hardware(config))
}
