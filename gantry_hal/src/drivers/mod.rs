//! Backend implementations.
//!
//! - [`simulation`] - Software carriage model for development and testing
//!
//! # Adding New Backends
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement `AxisDriver` and a `RawInput` (or a full `EndstopSensor`)
//! 3. Provide a `BackendFactory` and register it in [`register_all_drivers`]

pub mod simulation;

use crate::driver_registry::DriverRegistry;
use tracing::warn;

/// Register every built-in backend.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    if let Err(e) = registry.register("simulation", simulation::create_hardware) {
        warn!("Skipping simulation backend: {}", e);
    }
}
