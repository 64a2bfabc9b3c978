//! Synchronous serial port implementation.
//!
//! Wraps the `serialport` crate's `SerialPort` trait with our own
//! `SerialTransport` trait for dependency injection and testing.

use super::error::PortError;
use super::traits::{PortSettings, SerialTransport, TransportOpener};
use std::io::{Read, Write};
use std::time::Duration;

/// Synchronous serial transport wrapping `serialport::SerialPort`.
pub struct SyncSerialPort {
    /// The underlying serial port implementation.
    port: Box<dyn serialport::SerialPort>,
    /// The port name/path for identification.
    name: String,
}

impl SyncSerialPort {
    /// Open a serial port with the given line settings.
    ///
    /// All settings are handed to the driver in a single open call, so the
    /// port is never observable in a half-configured state.
    ///
    /// # Arguments
    /// * `port_name` - The system path to the serial port (e.g., "/dev/ttyUSB0" or "COM3")
    /// * `settings` - Line settings for the port
    ///
    /// # Example
    /// ```no_run
    /// use sms_gateway::port::{PortSettings, SyncSerialPort};
    ///
    /// let settings = PortSettings::default();
    /// let port = SyncSerialPort::open("/dev/ttyUSB0", &settings)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(port_name: &str, settings: &PortSettings) -> Result<Self, PortError> {
        let port = serialport::new(port_name, settings.baud_rate)
            .data_bits(settings.data_bits.into())
            .flow_control(settings.flow_control.into())
            .parity(settings.parity.into())
            .stop_bits(settings.stop_bits.into())
            .timeout(settings.timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => PortError::not_found(port_name),
                // Unix reports a missing device node as a plain io NotFound.
                serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                    PortError::not_found(port_name)
                }
                serialport::ErrorKind::InvalidInput => PortError::unsupported(e.to_string()),
                _ => PortError::Serial(e),
            })?;

        Ok(Self {
            port,
            name: port_name.to_string(),
        })
    }
}

impl SerialTransport for SyncSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.port.write(data).map_err(PortError::Io)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        match self.port.read(buffer) {
            Ok(n) => Ok(n),
            // A timed-out poll is "nothing arrived", not a failure.
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(PortError::Io(e)),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
        self.port.set_timeout(timeout).map_err(PortError::Serial)
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        self.port
            .clear(serialport::ClearBuffer::All)
            .map_err(PortError::Serial)
    }

    fn bytes_to_read(&self) -> Option<usize> {
        self.port.bytes_to_read().ok().map(|n| n as usize)
    }

    fn try_clone(&self) -> Result<Box<dyn SerialTransport>, PortError> {
        let clone = self.port.try_clone().map_err(PortError::Serial)?;
        Ok(Box::new(Self {
            port: clone,
            name: self.name.clone(),
        }))
    }
}

impl std::fmt::Debug for SyncSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSerialPort")
            .field("name", &self.name)
            .field("baud_rate", &self.port.baud_rate())
            .finish()
    }
}

/// [`TransportOpener`] backed by real system serial ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl TransportOpener for SystemOpener {
    fn open_transport(
        &self,
        port_name: &str,
        settings: &PortSettings,
    ) -> Result<Box<dyn SerialTransport>, PortError> {
        SyncSerialPort::open(port_name, settings).map(|p| Box::new(p) as Box<dyn SerialTransport>)
    }
}
