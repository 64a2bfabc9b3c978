//! SMS Gateway Library
//!
//! This library drives a GSM modem over a serial line to deliver one-time
//! verification codes as text messages. The modem is spoken to with plain
//! AT commands in text mode; delivery is fire-and-forget with the port
//! acquired per message and released afterwards.
//!
//! # Modules
//!
//! - `config`: Configuration management with TOML support
//! - `gateway`: High-level send API tying the pieces together
//! - `command`: AT command frames and the send sequence
//! - `connection`: Port acquisition, retry on contention, release
//! - `listener`: Background drain of unsolicited modem output
//! - `registry`: Port enumeration and case-insensitive resolution
//! - `port`: Serial transport abstraction with a mock for tests
//! - `cancel`: Cooperative cancellation shared across a send
//! - `error`: Unified error handling

pub mod cancel;
pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod gateway;
pub mod listener;
pub mod port;
pub mod registry;

// Re-export commonly used types for convenience
pub use cancel::CancelToken;
pub use command::{AtCommand, CommandChannel, FrameError, CTRL_Z, MAX_BODY_LEN};
pub use error::{GatewayError, GatewayResult};
pub use gateway::{MessageTemplate, ModemProfile, SendReport, SmsGateway};
pub use port::{
    DataBits, FlowControl, MockSerialPort, Parity, PortError, PortSettings, SerialTransport,
    StopBits, SyncSerialPort, SystemOpener, TransportOpener,
};
pub use registry::{PortDescriptor, PortKind, PortRegistry};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
