//! Command link to the peripheral controller.
//!
//! Pumps and the rotating applicator are driven by a companion controller
//! reached over a serial line. Framing is one ASCII token per line; any
//! lines the controller prints back within a short window are returned as
//! informational output. There is no acknowledgment.
//!
//! - [`PeripheralLink`] - Capability used by the wash cycle
//! - [`LineLink`] / [`SerialLink`] - Newline framing over any byte stream
//! - [`SimulatedPeripherals`] - Recording link used without hardware

mod serial;
mod simulation;

pub use serial::{LineLink, SerialLink};
pub use simulation::SimulatedPeripherals;

use gantry_common::hal::config::PeripheralConfig;
use gantry_common::hal::driver::HalError;
use std::fmt;
use tracing::info;

/// Commands understood by the peripheral controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeripheralCommand {
    /// Run the rotating applicator.
    Rotate,
    /// Spray soap.
    PumpSoap,
    /// Spray water.
    PumpWater,
    /// Any other token supported by the controller firmware.
    Custom(String),
}

impl PeripheralCommand {
    /// Wire token (without the line terminator).
    pub fn token(&self) -> &str {
        match self {
            PeripheralCommand::Rotate => "rotate",
            PeripheralCommand::PumpSoap => "pump_soap",
            PeripheralCommand::PumpWater => "pump_water",
            PeripheralCommand::Custom(token) => token.as_str(),
        }
    }

    /// Parse a token, mapping known ones to their variants.
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            "rotate" => PeripheralCommand::Rotate,
            "pump_soap" => PeripheralCommand::PumpSoap,
            "pump_water" => PeripheralCommand::PumpWater,
            other => PeripheralCommand::Custom(other.to_string()),
        }
    }

    /// Rejects tokens that would break the line framing.
    pub fn validate(&self) -> Result<(), HalError> {
        let token = self.token();
        if token.is_empty() || token.contains(['\n', '\r']) {
            return Err(HalError::CommunicationError(format!(
                "invalid peripheral token {token:?}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for PeripheralCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Capability to actuate the peripherals.
pub trait PeripheralLink: Send {
    /// Send one command and return the informational response lines.
    fn send(&mut self, command: &PeripheralCommand) -> Result<Vec<String>, HalError>;
}

/// Open the configured link: the serial port when `port` is set, the
/// simulated controller otherwise.
pub fn open_link(config: &PeripheralConfig) -> Result<Box<dyn PeripheralLink>, HalError> {
    match &config.port {
        Some(port) => Ok(Box::new(SerialLink::open(port, config)?)),
        None => {
            info!("No peripheral port configured, using simulated peripherals");
            Ok(Box::new(SimulatedPeripherals::new()))
        }
    }
}
