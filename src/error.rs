//! Unified application error type.
//!
//! The gateway surface collapses to success/failure for callers that only
//! care whether the message went out, but everything underneath reports
//! through this type so logs can say what actually happened.

use crate::command::FrameError;
use crate::config::ConfigError;
use crate::port::PortError;
use thiserror::Error;

/// A specialized `Result` type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Anything that can stop a message from reaching the modem.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The serial layer failed: port missing, busy, or I/O trouble.
    #[error(transparent)]
    Port(#[from] PortError),

    /// The recipient or message body was rejected before framing.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The message template cannot produce a message.
    #[error("invalid message template: {0}")]
    Template(String),

    /// Configuration could not be loaded or validated.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
