//! Core traits for serial transport abstraction.
//!
//! Defines the `SerialTransport` trait that allows both real serial ports
//! and mock implementations to be used interchangeably.

use super::error::PortError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Line settings applied to a serial port as one unit at open time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSettings {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Number of data bits (5, 6, 7, or 8).
    pub data_bits: DataBits,

    /// Flow control mode.
    pub flow_control: FlowControl,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Read/write timeout.
    pub timeout: Duration,
}

impl Default for PortSettings {
    /// Line settings a GSM modem expects: 115200 baud, 8N1, RTS/CTS.
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::Hardware,
            parity: Parity::None,
            stop_bits: StopBits::One,
            timeout: Duration::from_secs(1),
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl TryFrom<u8> for DataBits {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(format!("data bits must be 5-8, got {other}")),
        }
    }
}

impl From<DataBits> for u8 {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StopBits {
    One,
    Two,
}

impl TryFrom<u8> for StopBits {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            other => Err(format!("stop bits must be 1 or 2, got {other}")),
        }
    }
}

impl From<StopBits> for u8 {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// Trait for serial transport I/O operations.
///
/// This trait abstracts over synchronous serial port operations, allowing both
/// real hardware ports and mock implementations for testing.
pub trait SerialTransport: Send + std::fmt::Debug {
    /// Write bytes to the transport.
    ///
    /// Returns the number of bytes actually written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read bytes from the transport into the provided buffer.
    ///
    /// Returns the number of bytes actually read. A read timeout is reported
    /// as `Ok(0)` so pollers can distinguish "nothing arrived" from failure.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Get the name/path of this transport.
    fn name(&self) -> &str;

    /// Set the read/write timeout.
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError>;

    /// Clear both input and output buffers.
    ///
    /// This discards any unread data in the receive buffer and any unsent
    /// data in the transmit buffer.
    fn clear_buffers(&mut self) -> Result<(), PortError>;

    /// Get the current bytes available to read (if supported).
    ///
    /// Returns `None` if the operation is not supported or cannot be determined.
    fn bytes_to_read(&self) -> Option<usize> {
        None
    }

    /// Clone a second handle onto the same underlying device.
    ///
    /// The clone is handed to the notification listener so that exactly one
    /// component reads from the device while another writes to it.
    fn try_clone(&self) -> Result<Box<dyn SerialTransport>, PortError>;

    /// Write an entire buffer, retrying short writes until done.
    fn write_all_bytes(&mut self, data: &[u8]) -> Result<(), PortError> {
        let mut written = 0;
        while written < data.len() {
            let n = self.write_bytes(&data[written..])?;
            if n == 0 {
                return Err(PortError::Io(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "transport accepted no bytes",
                )));
            }
            written += n;
        }
        Ok(())
    }
}

/// Factory seam for opening transports.
///
/// The connection manager opens ports through this trait so tests can
/// substitute mocks and simulate contention without real hardware.
pub trait TransportOpener: Send + Sync {
    /// Attempt a single exclusive open of the named port.
    fn open_transport(
        &self,
        port_name: &str,
        settings: &PortSettings,
    ) -> Result<Box<dyn SerialTransport>, PortError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_match_modem_line() {
        let settings = PortSettings::default();
        assert_eq!(settings.baud_rate, 115_200);
        assert_eq!(settings.data_bits, DataBits::Eight);
        assert_eq!(settings.flow_control, FlowControl::Hardware);
        assert_eq!(settings.parity, Parity::None);
        assert_eq!(settings.stop_bits, StopBits::One);
        assert_eq!(settings.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_data_bits_conversion() {
        let bits = DataBits::Eight;
        let serialport_bits: serialport::DataBits = bits.into();
        assert_eq!(serialport_bits, serialport::DataBits::Eight);
    }

    #[test]
    fn test_data_bits_from_u8() {
        assert_eq!(DataBits::try_from(8), Ok(DataBits::Eight));
        assert_eq!(DataBits::try_from(5), Ok(DataBits::Five));
        assert!(DataBits::try_from(4).is_err());
        assert!(DataBits::try_from(9).is_err());
    }

    #[test]
    fn test_stop_bits_from_u8() {
        assert_eq!(StopBits::try_from(1), Ok(StopBits::One));
        assert_eq!(StopBits::try_from(2), Ok(StopBits::Two));
        assert!(StopBits::try_from(0).is_err());
        assert!(StopBits::try_from(3).is_err());
    }

    #[test]
    fn test_flow_control_conversion() {
        let flow = FlowControl::Hardware;
        let serialport_flow: serialport::FlowControl = flow.into();
        assert_eq!(serialport_flow, serialport::FlowControl::Hardware);
    }

    #[test]
    fn test_parity_conversion() {
        let parity = Parity::Even;
        let serialport_parity: serialport::Parity = parity.into();
        assert_eq!(serialport_parity, serialport::Parity::Even);
    }

    #[test]
    fn test_stop_bits_conversion() {
        let stop_bits = StopBits::Two;
        let serialport_stop_bits: serialport::StopBits = stop_bits.into();
        assert_eq!(serialport_stop_bits, serialport::StopBits::Two);
    }
}
