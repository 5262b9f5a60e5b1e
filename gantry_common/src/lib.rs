//! Gantry Common Library
//!
//! This crate provides the shared vocabulary of the gantry workspace:
//! axis and direction types, motion intents and commands, the hardware
//! capability traits implemented by `gantry_hal`, and the TOML
//! configuration structures loaded by the `gantry` binary.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading trait, top-level `GantryConfig`
//! - [`consts`] - System-wide defaults
//! - [`hal`] - Capability traits (`AxisDriver`, `EndstopSensor`), hardware types and config
//! - [`motion`] - Motion intents, commands, motion/homing/storage configuration
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use gantry_common::prelude::*;
//!
//! let cmd = MotionCommand::ToggleContinuous(Axis::Y, Direction::Backward);
//! assert_eq!(cmd.axis(), Some(Axis::Y));
//! ```

pub mod config;
pub mod consts;
pub mod hal;
pub mod motion;
pub mod prelude;
