//! Hardware abstraction types, capability traits and configuration.
//!
//! This module contains the seam between the motion core and the hardware
//! backends in `gantry_hal`.

pub mod config;
pub mod driver;
pub mod types;
