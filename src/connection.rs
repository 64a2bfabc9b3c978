//! Modem connection lifecycle.
//!
//! A connection is the exclusive claim on one serial port for the duration
//! of one delivery: acquire the port (retrying while a previous owner still
//! holds it), flush stale buffers, hand the read half to a background
//! listener, and release everything on drop. Release is tied to `Drop` so
//! no failure path can leak the OS handle.
//!
//! Ownership transitions are reported through structured log events
//! (`port_owned`, `port_in_use`, `port_unowned`) rather than any callback
//! machinery.

use crate::cancel::CancelToken;
use crate::command::CommandChannel;
use crate::listener::{InboundSink, NotificationListener};
use crate::port::{PortError, PortSettings, SerialTransport, TransportOpener};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Pause between open attempts while the port is held by another process.
const ACQUIRE_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// An exclusively held serial port with its listener running.
///
/// The connection owns the write half; the listener thread owns a cloned
/// read half. That split means the command path never reads and the drain
/// path never writes, so neither can stall the other.
pub struct ModemConnection {
    transport: Box<dyn SerialTransport>,
    listener: Option<NotificationListener>,
    name: String,
}

impl ModemConnection {
    /// Acquire `port_name` exclusively and start draining its output.
    ///
    /// Line settings are applied by the opener in a single call, so the
    /// device is never visible half-configured. While another process holds
    /// the port, the open is retried until `acquire_timeout` has elapsed,
    /// then gives up with [`PortError::Busy`]. The retry wait is
    /// interruptible through `cancel`.
    pub fn open(
        opener: &dyn TransportOpener,
        port_name: &str,
        settings: &PortSettings,
        acquire_timeout: Duration,
        cancel: &CancelToken,
        sink: Box<dyn InboundSink>,
    ) -> Result<Self, PortError> {
        let started = Instant::now();
        let mut reported_contested = false;

        let mut transport = loop {
            match opener.open_transport(port_name, settings) {
                Ok(transport) => break transport,
                Err(e) if e.is_contested() => {
                    if !reported_contested {
                        warn!(
                            port = port_name,
                            event = "port_in_use",
                            "serial port held by another process, retrying"
                        );
                        reported_contested = true;
                    }
                    if started.elapsed() >= acquire_timeout {
                        return Err(PortError::busy(port_name, started.elapsed()));
                    }
                    if !cancel.wait_for(ACQUIRE_RETRY_INTERVAL) {
                        return Err(PortError::Cancelled);
                    }
                }
                Err(e) => return Err(e),
            }
        };

        info!(
            port = port_name,
            baud = settings.baud_rate,
            event = "port_owned",
            "serial port acquired"
        );

        // Whatever a previous owner left behind must not be mistaken for
        // responses to our commands.
        transport.clear_buffers()?;

        let reader = transport.try_clone()?;
        let listener = NotificationListener::spawn(reader, sink)?;
        debug!(port = port_name, "notification listener started");

        Ok(Self {
            transport,
            listener: Some(listener),
            name: port_name.to_string(),
        })
    }

    /// The port this connection holds.
    pub fn port_name(&self) -> &str {
        &self.name
    }

    /// Borrow the write half as a command channel.
    ///
    /// The exclusive borrow guarantees only one command sequence runs on
    /// this connection at a time.
    pub fn channel<'a>(&'a mut self, cancel: &'a CancelToken) -> CommandChannel<'a> {
        CommandChannel::new(self.transport.as_mut(), cancel)
    }

    /// Bytes the listener has drained since the connection opened.
    pub fn drained_bytes(&self) -> u64 {
        self.listener.as_ref().map_or(0, |l| l.bytes_drained())
    }

    /// Whether the listener thread is still draining.
    pub fn listener_running(&self) -> bool {
        self.listener.as_ref().is_some_and(|l| l.is_running())
    }

    /// Release the port, returning the total bytes the listener drained
    /// over the connection's lifetime, its final sweep included.
    ///
    /// Dropping the connection releases the port the same way; this form
    /// additionally reports the count.
    pub fn close(mut self) -> u64 {
        self.listener.take().map_or(0, NotificationListener::stop)
    }
}

impl Drop for ModemConnection {
    fn drop(&mut self) {
        // The listener joins first so its cloned handle is gone before the
        // write half releases the device.
        if let Some(listener) = self.listener.take() {
            listener.stop();
        }
        info!(port = %self.name, event = "port_unowned", "serial port released");
    }
}
