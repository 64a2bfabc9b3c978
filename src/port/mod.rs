//! Port abstraction layer for serial communication.
//!
//! Provides traits and implementations for serial I/O, enabling dependency
//! injection and testing via mocks.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::{MockOpener, MockSerialPort};
pub use sync_port::*;
pub use traits::*;
