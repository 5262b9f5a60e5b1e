//! Backend registry.
//!
//! Provides a `DriverRegistry` struct for registering and retrieving backend
//! factories by name. The registry is constructed at startup and passed by
//! value; there is no global state.

use gantry_common::hal::config::MachineConfig;
use gantry_common::hal::driver::{AxisDriver, EndstopSensor, HalError};
use gantry_common::hal::types::Axis;
use std::collections::HashMap;
use tracing::info;

/// Driver and limit switch of one axis.
pub struct AxisHardware {
    /// Step emission primitive.
    pub driver: Box<dyn AxisDriver>,
    /// Minimum endstop.
    pub endstop: Box<dyn EndstopSensor>,
}

/// Everything a backend provides for the two-axis gantry.
pub struct Hardware {
    /// Horizontal axis.
    pub x: AxisHardware,
    /// Vertical axis.
    pub y: AxisHardware,
}

impl Hardware {
    /// Hardware of the given axis.
    pub fn axis_mut(&mut self, axis: Axis) -> &mut AxisHardware {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
        }
    }

    /// Split into per-axis parts in `Axis::ALL` order.
    pub fn into_axes(self) -> [AxisHardware; 2] {
        [self.x, self.y]
    }
}

/// Factory building the hardware of a backend from the machine configuration.
///
/// Bring-up failures are reported as `HalError::InitFailed` and are fatal.
pub type BackendFactory = fn(&MachineConfig) -> Result<Hardware, HalError>;

/// Registry of available backends.
pub struct DriverRegistry {
    factories: HashMap<&'static str, BackendFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in backend.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::drivers::register_all_drivers(&mut registry);
        registry
    }

    /// Register a backend factory.
    ///
    /// # Errors
    /// Returns `HalError::ConfigError` if a backend with the same name is
    /// already registered.
    pub fn register(&mut self, name: &'static str, factory: BackendFactory) -> Result<(), HalError> {
        if self.factories.contains_key(name) {
            return Err(HalError::ConfigError(format!(
                "Driver '{name}' is already registered"
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Get a backend factory by name.
    pub fn get_factory(&self, name: &str) -> Option<BackendFactory> {
        self.factories.get(name).copied()
    }

    /// Build the hardware of the named backend.
    ///
    /// # Errors
    /// Returns `HalError::DriverNotFound` if no backend with the given name
    /// is registered, or the factory's own bring-up error.
    pub fn create(&self, name: &str, config: &MachineConfig) -> Result<Hardware, HalError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| HalError::DriverNotFound(name.to_string()))?;
        info!("Creating hardware with backend '{}'", name);
        factory(config)
    }

    /// List all registered backend names.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
