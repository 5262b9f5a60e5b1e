//! Simulated peripheral controller.

use super::{PeripheralCommand, PeripheralLink};
use gantry_common::hal::driver::HalError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Link that records every command and answers with `"<token> done"`.
///
/// Clones share the same history, so a test can keep one handle while the
/// wash cycle owns another.
#[derive(Debug, Clone, Default)]
pub struct SimulatedPeripherals {
    history: Arc<Mutex<Vec<PeripheralCommand>>>,
    fail_next: Arc<AtomicBool>,
}

impl SimulatedPeripherals {
    /// Create a link with an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands sent so far, in order.
    pub fn history(&self) -> Vec<PeripheralCommand> {
        self.history.lock().clone()
    }

    /// Make the next `send` fail with a communication error.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

impl PeripheralLink for SimulatedPeripherals {
    fn send(&mut self, command: &PeripheralCommand) -> Result<Vec<String>, HalError> {
        command.validate()?;
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(HalError::CommunicationError(format!(
                "simulated link dropped {command}"
            )));
        }
        info!("Simulated peripheral command: {}", command);
        self.history.lock().push(command.clone());
        Ok(vec![format!("{} done", command.token())])
    }
}
