//! Serial port line source for the Pico firmware.

use std::io::{ErrorKind, Read};
use std::thread;

use serialport::{ClearBuffer, SerialPort, SerialPortType};

use super::replay::decode_line;
use super::{LineSource, ReadOutcome};
use crate::config::SerialConfig;
use crate::error::TransportError;

/// Longest run of bytes without a newline before it is thrown away as noise
const MAX_PENDING_BYTES: usize = 4096;

/// Reads newline-terminated text from a serial port.
///
/// Bytes are accumulated across reads so a timeout in the middle of a line
/// doesn't lose its first half.
pub struct SerialLineSource {
    port: Box<dyn SerialPort>,
    port_name: String,
    pending: Vec<u8>,
}

impl SerialLineSource {
    /// Open the configured port, wait for the board to settle and drop
    /// whatever it printed while we weren't listening.
    pub fn open(config: &SerialConfig) -> Result<Self, TransportError> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.read_timeout())
            .open()
            .map_err(|err| TransportError::OpenFailed {
                port: config.port.clone(),
                reason: err.to_string(),
            })?;

        tracing::info!(
            "[Serial] Opened {} at {} baud (timeout {} ms)",
            config.port,
            config.baud_rate,
            config.read_timeout_ms
        );

        let mut source = Self {
            port,
            port_name: config.port.clone(),
            pending: Vec::with_capacity(256),
        };

        thread::sleep(config.connect_settle());
        source.discard_pending()?;
        Ok(source)
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn take_buffered_line(&mut self) -> Option<Vec<u8>> {
        let newline = self.pending.iter().position(|&b| b == b'\n')?;
        Some(self.pending.drain(..=newline).collect())
    }
}

impl LineSource for SerialLineSource {
    fn read_line(&mut self) -> Result<ReadOutcome, TransportError> {
        let mut chunk = [0u8; 256];
        loop {
            if let Some(line) = self.take_buffered_line() {
                return Ok(decode_line(&line));
            }

            match self.port.read(&mut chunk) {
                Ok(0) => return Ok(ReadOutcome::Closed),
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    if self.pending.len() > MAX_PENDING_BYTES && !self.pending.contains(&b'\n') {
                        tracing::warn!(
                            "[Serial] {} bytes without a newline on {}, discarding",
                            self.pending.len(),
                            self.port_name
                        );
                        self.pending.clear();
                        return Ok(ReadOutcome::Empty);
                    }
                }
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) =>
                {
                    return Ok(ReadOutcome::Empty);
                }
                Err(err) => {
                    return Err(TransportError::ReadFailed {
                        reason: format!("{}: {}", self.port_name, err),
                    });
                }
            }
        }
    }

    fn discard_pending(&mut self) -> Result<(), TransportError> {
        self.pending.clear();
        self.port
            .clear(ClearBuffer::Input)
            .map_err(|err| TransportError::ReadFailed {
                reason: format!("clearing input on {}: {}", self.port_name, err),
            })
    }
}

/// A serial port visible to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortListing {
    pub name: String,
    pub description: String,
}

/// Enumerate the serial ports the OS knows about
pub fn list_ports() -> Result<Vec<PortListing>, TransportError> {
    let ports =
        serialport::available_ports().map_err(|err| TransportError::PortEnumerationFailed {
            reason: err.to_string(),
        })?;

    Ok(ports
        .into_iter()
        .map(|info| {
            let description = match info.port_type {
                SerialPortType::UsbPort(usb) => format!(
                    "USB {:04x}:{:04x} {}",
                    usb.vid,
                    usb.pid,
                    usb.product.unwrap_or_default()
                ),
                SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                SerialPortType::PciPort => "PCI".to_string(),
                SerialPortType::Unknown => "unknown".to_string(),
            };
            PortListing {
                name: info.port_name,
                description: description.trim_end().to_string(),
            }
        })
        .collect())
}
