//! Serial transport.
//!
//! The display enumerates as a USB CDC device whose port name differs
//! between operating systems and driver versions (`/dev/ttyACM0`,
//! `/dev/cu.usbmodemUSB35INCHIPSV21`, `COM5`, ...). Ports are therefore
//! selected by substring: the first enumerated port whose name contains
//! the configured needle wins.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serialport::SerialPort;
use tracing::{debug, info};

use crate::error::ScreenError;
use crate::transport::Transport;

// ── SerialOptions ────────────────────────────────────────────────

/// Line settings applied after the port is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialOptions {
    /// Line speed in bits per second.
    pub baud_rate: u32,
    /// Assert Data Terminal Ready.
    pub dtr: bool,
    /// Assert Request To Send.
    pub rts: bool,
    /// Upper bound for a single read, in milliseconds.
    pub read_timeout_ms: u64,
}

impl Default for SerialOptions {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            dtr: true,
            rts: true,
            read_timeout_ms: 1,
        }
    }
}

impl SerialOptions {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

// ── Discovery ────────────────────────────────────────────────────

/// Names of all serial ports currently visible to the OS.
pub fn list_ports() -> Result<Vec<String>, ScreenError> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|p| p.port_name)
        .collect())
}

/// First port whose name contains `needle`.
pub fn select_port<'a>(ports: &'a [String], needle: &str) -> Option<&'a str> {
    ports
        .iter()
        .find(|name| name.contains(needle))
        .map(String::as_str)
}

// ── SerialTransport ──────────────────────────────────────────────

/// An open serial line to the display.
pub struct SerialTransport {
    name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Resolve `needle` against the enumerated ports, open the match and
    /// apply `options`.
    pub fn open(needle: &str, options: &SerialOptions) -> Result<Self, ScreenError> {
        let ports = list_ports()?;
        debug!(?ports, needle, "enumerated serial ports");

        let name = select_port(&ports, needle)
            .ok_or_else(|| ScreenError::PortNotFound(needle.to_string()))?
            .to_string();

        let mut port = serialport::new(&name, options.baud_rate)
            .timeout(options.read_timeout())
            .open()?;
        port.write_data_terminal_ready(options.dtr)?;
        port.write_request_to_send(options.rts)?;

        info!(port = %name, baud = options.baud_rate, "serial port opened");
        Ok(Self {
            name,
            port: Some(port),
        })
    }

    /// The resolved port name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, ScreenError> {
        self.port.as_mut().ok_or(ScreenError::TransportClosed)
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, buf: &[u8]) -> Result<usize, ScreenError> {
        Ok(Write::write(self.port()?, buf)?)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ScreenError> {
        match Read::read(self.port()?, buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) -> Result<(), ScreenError> {
        if let Some(mut port) = self.port.take() {
            Write::flush(&mut port)?;
            info!(port = %self.name, "serial port closed");
        }
        Ok(())
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("name", &self.name)
            .field("open", &self.port.is_some())
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────
