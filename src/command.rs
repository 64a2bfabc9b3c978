//! AT command framing and the sequential command channel.
//!
//! A GSM modem in text mode accepts a rigid little language: one command
//! per write, carriage-return terminated, with a Ctrl-Z closing the message
//! body of `AT+CMGS`. This module builds those frames as values and replays
//! them over a [`SerialTransport`] in strict order, honoring the settle
//! delays the modem needs between mode switches.
//!
//! Recipient numbers and message bodies are validated before they are ever
//! framed. A body containing a stray Ctrl-Z, or a number containing a quote,
//! could otherwise terminate the message early and leave the remainder to be
//! interpreted as commands.

use crate::cancel::CancelToken;
use crate::port::{PortError, SerialTransport};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Ctrl-Z, the text-mode message terminator for `AT+CMGS`.
pub const CTRL_Z: u8 = 0x1A;

/// Delay the modem needs after a mode switch and after message submission.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(2000);

/// Longest message body accepted, in characters.
///
/// One SMS carries 160 GSM 7-bit characters. Longer bodies would be split
/// or truncated at the modem's whim, so they are rejected up front.
pub const MAX_BODY_LEN: usize = 160;

const MAX_NUMBER_DIGITS: usize = 15;
const MIN_NUMBER_DIGITS: usize = 3;

/// A payload was rejected before framing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The recipient number is not a plain dial string.
    #[error("invalid recipient number: {0}")]
    InvalidNumber(String),

    /// The message body cannot be carried in a text-mode frame.
    #[error("invalid message body: {0}")]
    InvalidBody(String),
}

/// One framed AT command, ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtCommand {
    bytes: Vec<u8>,
    label: &'static str,
    settle: Duration,
}

impl AtCommand {
    fn new(bytes: Vec<u8>, label: &'static str, settle: Duration) -> Self {
        Self {
            bytes,
            label,
            settle,
        }
    }

    /// `ATZ`, resetting the modem and re-registering it on the home network.
    pub fn reset() -> Self {
        Self::new(b"ATZ\r\n".to_vec(), "register to network", Duration::ZERO)
    }

    /// `AT+CREG?`, querying network registration status.
    pub fn registration_query() -> Self {
        Self::new(b"AT+CREG?\r\n".to_vec(), "check status", Duration::ZERO)
    }

    /// `AT+CMGF=1`, switching the modem into SMS text mode.
    ///
    /// The modem needs `settle` afterwards before it will accept a submit.
    pub fn text_mode(settle: Duration) -> Self {
        Self::new(b"AT+CMGF=1\r\n".to_vec(), "set to sms mode", settle)
    }

    /// `AT+CMGS="<number>"<CR><body><Ctrl-Z>`, submitting one message.
    ///
    /// The whole frame goes out as a single write: prompt handling is left
    /// to the modem's buffering, as the wire format requires no pause
    /// between the header and the body. Both payloads are validated; see
    /// [`validate_number`] and [`validate_body`].
    pub fn submit(number: &str, body: &str, settle: Duration) -> Result<Self, FrameError> {
        validate_number(number)?;
        validate_body(body)?;

        let mut bytes = Vec::with_capacity(number.len() + body.len() + 16);
        bytes.extend_from_slice(b"AT+CMGS=\"");
        bytes.extend_from_slice(number.as_bytes());
        bytes.extend_from_slice(b"\"\r");
        bytes.extend_from_slice(body.as_bytes());
        bytes.push(CTRL_Z);

        Ok(Self::new(bytes, "sending message", settle))
    }

    /// `ATH`, hanging up and returning the modem to command state.
    pub fn hangup() -> Self {
        Self::new(b"ATH\r\n".to_vec(), "hang up", Duration::ZERO)
    }

    /// The exact bytes this command puts on the wire.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Short human label for logging.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Delay required after this command before the next one.
    pub fn settle(&self) -> Duration {
        self.settle
    }
}

/// Check that a recipient is a plain dial string.
///
/// Accepted: an optional leading `+`, then 3 to 15 ASCII digits. Everything
/// else is rejected, which keeps quotes and control characters out of the
/// quoted `AT+CMGS` header.
pub fn validate_number(number: &str) -> Result<(), FrameError> {
    let digits = number.strip_prefix('+').unwrap_or(number);

    if digits.is_empty() {
        return Err(FrameError::InvalidNumber("empty number".into()));
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FrameError::InvalidNumber(
            "must be digits with an optional leading +".into(),
        ));
    }
    if digits.len() < MIN_NUMBER_DIGITS || digits.len() > MAX_NUMBER_DIGITS {
        return Err(FrameError::InvalidNumber(format!(
            "expected {MIN_NUMBER_DIGITS}-{MAX_NUMBER_DIGITS} digits, got {}",
            digits.len()
        )));
    }
    Ok(())
}

/// Check that a message body can travel in a single text-mode frame.
///
/// Bodies must be non-empty printable ASCII of at most [`MAX_BODY_LEN`]
/// characters, with no quote characters. Control characters are rejected
/// wholesale rather than escaped; Ctrl-Z in particular would terminate the
/// message early, and a quote could confuse firmware that scans the frame
/// for its address delimiters.
pub fn validate_body(body: &str) -> Result<(), FrameError> {
    if body.is_empty() {
        return Err(FrameError::InvalidBody("empty body".into()));
    }
    let length = body.chars().count();
    if length > MAX_BODY_LEN {
        return Err(FrameError::InvalidBody(format!(
            "{length} characters exceeds the single-message limit of {MAX_BODY_LEN}"
        )));
    }
    if let Some(bad) = body.bytes().find(|b| !(0x20..=0x7E).contains(b)) {
        return Err(FrameError::InvalidBody(format!(
            "byte 0x{bad:02X} is outside printable ASCII"
        )));
    }
    if body.contains('"') {
        return Err(FrameError::InvalidBody(
            "quote characters are not allowed".into(),
        ));
    }
    Ok(())
}

/// Build the fixed frame sequence that delivers one message.
///
/// Reset, registration check, text mode, submit, hang up. The settle
/// delay sits after the mode switch and after the submit, which is where
/// the modem does its slow work.
pub fn message_sequence(
    number: &str,
    body: &str,
    settle: Duration,
) -> Result<Vec<AtCommand>, FrameError> {
    Ok(vec![
        AtCommand::reset(),
        AtCommand::registration_query(),
        AtCommand::text_mode(settle),
        AtCommand::submit(number, body, settle)?,
        AtCommand::hangup(),
    ])
}

/// Serialized writer of AT command frames.
///
/// Borrows the connection's transport for the duration of one sequence, so
/// the borrow checker enforces that frames from different sends can never
/// interleave on the wire.
pub struct CommandChannel<'a> {
    transport: &'a mut dyn SerialTransport,
    cancel: &'a CancelToken,
}

impl<'a> CommandChannel<'a> {
    pub fn new(transport: &'a mut dyn SerialTransport, cancel: &'a CancelToken) -> Self {
        Self { transport, cancel }
    }

    /// Write one frame and sit out its settle delay.
    ///
    /// Returns [`PortError::Cancelled`] without touching the wire if the
    /// token was already cancelled, and from inside the settle wait if
    /// cancellation lands there.
    pub fn issue(&mut self, command: &AtCommand) -> Result<(), PortError> {
        if self.cancel.is_cancelled() {
            return Err(PortError::Cancelled);
        }

        debug!(
            command = command.label(),
            bytes = command.bytes().len(),
            "writing AT command"
        );
        self.transport.write_all_bytes(command.bytes())?;

        if !command.settle().is_zero() && !self.cancel.wait_for(command.settle()) {
            return Err(PortError::Cancelled);
        }
        Ok(())
    }

    /// Issue a sequence in order, stopping at the first failure.
    ///
    /// On failure no further frame is written; the caller decides whether
    /// the modem needs recovery.
    pub fn run(&mut self, commands: &[AtCommand]) -> Result<(), PortError> {
        for command in commands {
            self.issue(command)?;
        }
        Ok(())
    }
}
