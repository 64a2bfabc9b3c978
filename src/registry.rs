//! Serial port discovery and name resolution.
//!
//! The registry answers two questions: what serial devices exist right now,
//! and does a configured port name correspond to one of them. Resolution
//! happens against a fresh enumeration on every call, so devices that were
//! unplugged since startup are reported as missing rather than opened blind.

use crate::port::PortError;
use serialport::SerialPortType;
use std::fmt;

/// Identity of one serial device visible on the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    /// System name of the device, e.g. `COM3` or `/dev/ttyUSB0`.
    pub name: String,
    /// What kind of bus the device hangs off.
    pub kind: PortKind,
}

impl PortDescriptor {
    pub fn new(name: impl Into<String>, kind: PortKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Transport class of an enumerated serial device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortKind {
    /// USB serial adapter, with whatever identity the descriptor carried.
    Usb {
        vid: u16,
        pid: u16,
        serial_number: Option<String>,
        product: Option<String>,
    },
    /// PCI or motherboard UART.
    Pci,
    /// Bluetooth SPP link.
    Bluetooth,
    /// Platform could not classify the device.
    Unknown,
}

impl From<SerialPortType> for PortKind {
    fn from(port_type: SerialPortType) -> Self {
        match port_type {
            SerialPortType::UsbPort(info) => PortKind::Usb {
                vid: info.vid,
                pid: info.pid,
                serial_number: info.serial_number,
                product: info.product,
            },
            SerialPortType::PciPort => PortKind::Pci,
            SerialPortType::BluetoothPort => PortKind::Bluetooth,
            SerialPortType::Unknown => PortKind::Unknown,
        }
    }
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortKind::Usb {
                vid, pid, product, ..
            } => {
                write!(f, "USB {vid:04x}:{pid:04x}")?;
                if let Some(product) = product {
                    write!(f, " ({product})")?;
                }
                Ok(())
            }
            PortKind::Pci => write!(f, "PCI"),
            PortKind::Bluetooth => write!(f, "Bluetooth"),
            PortKind::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Source of truth for which serial devices exist.
#[derive(Debug, Clone)]
pub struct PortRegistry {
    source: Source,
}

#[derive(Debug, Clone)]
enum Source {
    /// Enumerate real devices through the platform APIs.
    System,
    /// A fixed device list, for tests and dry runs.
    Fixed(Vec<PortDescriptor>),
}

impl PortRegistry {
    /// Registry backed by live platform enumeration.
    pub fn system() -> Self {
        Self {
            source: Source::System,
        }
    }

    /// Registry backed by a fixed descriptor list.
    pub fn fixed(descriptors: Vec<PortDescriptor>) -> Self {
        Self {
            source: Source::Fixed(descriptors),
        }
    }

    /// List every serial device currently visible.
    pub fn enumerate(&self) -> Result<Vec<PortDescriptor>, PortError> {
        match &self.source {
            Source::System => {
                let ports = serialport::available_ports()?;
                Ok(ports
                    .into_iter()
                    .map(|p| PortDescriptor {
                        name: p.port_name,
                        kind: p.port_type.into(),
                    })
                    .collect())
            }
            Source::Fixed(descriptors) => Ok(descriptors.clone()),
        }
    }

    /// Find the device with the given name.
    ///
    /// Matching ignores ASCII case, so `com3` resolves to `COM3`. A name
    /// that matches nothing yields [`PortError::NotFound`].
    pub fn resolve(&self, name: &str) -> Result<PortDescriptor, PortError> {
        self.enumerate()?
            .into_iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| PortError::not_found(name))
    }
}
