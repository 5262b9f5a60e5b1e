//! # Gantry HAL Library
//!
//! Hardware side of the gantry controller. Backends implement the
//! `AxisDriver` and `EndstopSensor` traits defined in
//! `gantry_common::hal::driver`; the motion core only ever sees those traits.
//!
//! # Module Structure
//!
//! - [`driver_registry`] - Backend factory registration
//! - [`drivers`] - Backend implementations (simulation)
//! - [`endstop`] - Debouncer and polled endstop sensor
//! - [`peripheral`] - Newline-framed command link to the pump/rotation controller
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     gantry_hal                                │
//! │  ┌──────────────────┐   creates   ┌────────────────────────┐  │
//! │  │ DriverRegistry   │────────────►│ Hardware               │  │
//! │  │ ("simulation")   │             │  x: driver + endstop   │  │
//! │  └──────────────────┘             │  y: driver + endstop   │  │
//! │                                   └───────────┬────────────┘  │
//! │  ┌──────────────────┐                         │               │
//! │  │ PeripheralLink   │                         ▼               │
//! │  │ serial | sim     │            gantry_motion (scheduler)    │
//! │  └──────────────────┘                                         │
//! └───────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod driver_registry;
pub mod drivers;
pub mod endstop;
pub mod peripheral;

// Re-export key types for convenience
pub use crate::driver_registry::{AxisHardware, BackendFactory, DriverRegistry, Hardware};
pub use crate::endstop::{Debouncer, PolledEndstop, RawInput};
pub use crate::peripheral::{PeripheralCommand, PeripheralLink};
