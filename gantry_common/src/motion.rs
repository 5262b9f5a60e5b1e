//! Motion vocabulary shared by the core and its callers.
//!
//! Defines the per-axis motion intent, the commands accepted by the intent
//! register, and the configuration of the motion core.

pub mod command;
pub mod config;
pub mod homing;
