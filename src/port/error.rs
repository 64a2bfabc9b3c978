//! Port-specific error types.
//!
//! Covers everything that can go wrong between "resolve a port name" and
//! "bytes on the wire": the configured transport being absent, another
//! process holding it, the driver rejecting our line settings, and plain
//! I/O failures.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during serial transport operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The configured serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// Exclusive ownership could not be acquired within the timeout.
    #[error("Serial port {port} busy after {waited:?}")]
    Busy { port: String, waited: Duration },

    /// The driver rejected the requested line settings.
    #[error("Unsupported port configuration: {0}")]
    UnsupportedConfig(String),

    /// An I/O error occurred while reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialport-specific error that fits none of the above.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The operation was cancelled while waiting.
    #[error("Operation cancelled")]
    Cancelled,
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Busy error from a port name and the time spent waiting.
    pub fn busy(port_name: impl Into<String>, waited: Duration) -> Self {
        Self::Busy {
            port: port_name.into(),
            waited,
        }
    }

    /// Create an UnsupportedConfig error from a message.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedConfig(message.into())
    }

    /// Whether this error means another process currently owns the port,
    /// i.e. retrying the open within the acquire timeout is worthwhile.
    pub fn is_contested(&self) -> bool {
        match self {
            Self::Busy { .. } => true,
            Self::Io(e) => io_error_is_busy(e),
            Self::Serial(e) => serial_error_is_busy(e),
            _ => false,
        }
    }
}

/// Classify an OS-level open failure as "port held by someone else".
#[cfg(unix)]
pub(crate) fn io_error_is_busy(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(libc::EBUSY)
}

/// Classify an OS-level open failure as "port held by someone else".
///
/// Windows reports an exclusively-opened COM port as access denied or,
/// with some drivers, as a sharing violation rather than busy.
#[cfg(windows)]
pub(crate) fn io_error_is_busy(e: &std::io::Error) -> bool {
    use winapi::shared::winerror::{ERROR_ACCESS_DENIED, ERROR_SHARING_VIOLATION};
    matches!(
        e.raw_os_error(),
        Some(code) if code == ERROR_ACCESS_DENIED as i32 || code == ERROR_SHARING_VIOLATION as i32
    )
}

fn serial_error_is_busy(e: &serialport::Error) -> bool {
    match e.kind() {
        serialport::ErrorKind::Io(_) => {
            // serialport drops the raw OS code when wrapping open errors,
            // so match on the description it preserved.
            let msg = e.to_string().to_lowercase();
            if msg.contains("busy") {
                return true;
            }
            // Only Windows reports an exclusively held COM port as access
            // denied; on unix that wording means permissions, and retrying
            // will never make it go away.
            cfg!(windows) && (msg.contains("access") || msg.contains("denied"))
        }
        _ => false,
    }
}
