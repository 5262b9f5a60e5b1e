//! Newline-framed link over a byte stream.

use super::{PeripheralCommand, PeripheralLink};
use gantry_common::hal::config::PeripheralConfig;
use gantry_common::hal::driver::HalError;
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Read timeout of the serial port; bounds one poll of the response window.
const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Peripheral link writing `token\n` to a stream and collecting the lines
/// read back within the response window.
pub struct LineLink<T> {
    stream: T,
    response_window: Duration,
}

/// Link over a real serial port.
pub type SerialLink = LineLink<Box<dyn serialport::SerialPort>>;

impl<T: Read + Write + Send> LineLink<T> {
    /// Wrap an already opened stream.
    pub fn new(stream: T, response_window: Duration) -> Self {
        Self {
            stream,
            response_window,
        }
    }

    /// Consume the link and return the stream.
    pub fn into_inner(self) -> T {
        self.stream
    }

    fn collect_lines(&mut self) -> Result<Vec<String>, HalError> {
        let deadline = Instant::now() + self.response_window;
        let mut pending = Vec::new();
        let mut lines = Vec::new();
        let mut buf = [0u8; 256];

        while Instant::now() < deadline {
            match self.stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    pending.extend_from_slice(&buf[..n]);
                    while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                        let raw: Vec<u8> = pending.drain(..=pos).collect();
                        push_line(&mut lines, &raw);
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(HalError::CommunicationError(e.to_string())),
            }
        }
        push_line(&mut lines, &pending);
        Ok(lines)
    }
}

impl SerialLink {
    /// Open the serial port and wait for the controller to come up.
    ///
    /// # Errors
    /// Returns `HalError::InitFailed` if the port cannot be opened.
    pub fn open(port: &str, config: &PeripheralConfig) -> Result<Self, HalError> {
        let stream = serialport::new(port, config.baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| HalError::InitFailed(format!("Failed to open serial port {port}: {e}")))?;
        info!(
            "Opened peripheral link {} at {} baud, settling {}ms",
            port, config.baud_rate, config.settle_ms
        );
        // The controller resets when the port opens.
        std::thread::sleep(config.settle());
        Ok(Self::new(stream, config.response_window()))
    }
}

fn push_line(lines: &mut Vec<String>, raw: &[u8]) {
    let line = String::from_utf8_lossy(raw).trim().to_string();
    if !line.is_empty() {
        lines.push(line);
    }
}

impl<T: Read + Write + Send> PeripheralLink for LineLink<T> {
    fn send(&mut self, command: &PeripheralCommand) -> Result<Vec<String>, HalError> {
        command.validate()?;
        info!("Peripheral command: {}", command);
        self.stream
            .write_all(format!("{}\n", command.token()).as_bytes())
            .and_then(|_| self.stream.flush())
            .map_err(|e| HalError::CommunicationError(e.to_string()))?;

        let lines = self.collect_lines()?;
        for line in &lines {
            info!("Peripheral: {}", line);
        }
        debug!("{} response line(s) for {}", lines.len(), command);
        Ok(lines)
    }
}
