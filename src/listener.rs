//! Background drain of unsolicited modem output.
//!
//! The modem talks back: command echoes, `OK`/`ERROR` lines, `+CMGS`
//! confirmations, unsolicited `RING`s. None of it drives control flow, but
//! it must be drained or the receive buffer backs up and, under hardware
//! flow control, eventually stalls the device. The listener owns the read
//! half of the connection outright, which keeps reads off the command path
//! entirely.

use crate::port::{PortError, SerialTransport};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{trace, warn};

/// Size of the scratch buffer reads drain into.
pub const DRAIN_BUFFER_SIZE: usize = 2048;

/// How long one poll blocks waiting for modem output.
const POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Pause between polls that found nothing.
const IDLE_BACKOFF: Duration = Duration::from_millis(5);

/// Consumer of drained modem output.
///
/// Implementations must not block; the listener calls them from its read
/// loop between polls.
pub trait InboundSink: Send {
    /// Called once per drained chunk, in arrival order.
    fn on_chunk(&mut self, chunk: &[u8]);
}

/// Sink that logs each chunk at trace level.
#[derive(Debug, Default)]
pub struct TraceSink;

impl InboundSink for TraceSink {
    fn on_chunk(&mut self, chunk: &[u8]) {
        trace!(
            len = chunk.len(),
            data = %String::from_utf8_lossy(chunk).trim_end(),
            "modem chatter"
        );
    }
}

/// Sink that appends every chunk to a shared buffer.
///
/// Clones observe the same buffer, so a test can keep one handle while the
/// listener owns the other.
#[derive(Clone, Debug, Default)]
pub struct CaptureSink {
    data: Arc<Mutex<Vec<u8>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything captured so far, in arrival order.
    pub fn captured(&self) -> Vec<u8> {
        self.data.lock().clone()
    }
}

impl InboundSink for CaptureSink {
    fn on_chunk(&mut self, chunk: &[u8]) {
        self.data.lock().extend_from_slice(chunk);
    }
}

/// Handle to the background listener thread.
///
/// Dropping the handle stops the thread and joins it, so a listener never
/// outlives the connection that spawned it.
pub struct NotificationListener {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    bytes_drained: Arc<AtomicU64>,
}

impl NotificationListener {
    /// Spawn a listener that owns `transport` and drains it until stopped.
    ///
    /// The transport's timeout is shortened so stop requests are noticed
    /// within one poll interval.
    pub fn spawn(
        mut transport: Box<dyn SerialTransport>,
        mut sink: Box<dyn InboundSink>,
    ) -> Result<Self, PortError> {
        transport.set_timeout(POLL_TIMEOUT)?;

        let stop = Arc::new(AtomicBool::new(false));
        let bytes_drained = Arc::new(AtomicU64::new(0));
        let thread_stop = Arc::clone(&stop);
        let thread_bytes = Arc::clone(&bytes_drained);

        let handle = thread::Builder::new()
            .name("modem-listener".into())
            .spawn(move || {
                let mut buffer = [0u8; DRAIN_BUFFER_SIZE];
                while !thread_stop.load(Ordering::Relaxed) {
                    match drain_available(transport.as_mut(), &mut buffer, sink.as_mut()) {
                        Ok(0) => thread::sleep(IDLE_BACKOFF),
                        Ok(n) => {
                            thread_bytes.fetch_add(n as u64, Ordering::Relaxed);
                        }
                        Err(e) => {
                            warn!(port = transport.name(), error = %e, "listener read failed, stopping");
                            return;
                        }
                    }
                }
                // Bytes the device produced just before the stop request
                // still belong to this session; pick them up before the
                // read half goes away.
                if let Ok(n) = drain_available(transport.as_mut(), &mut buffer, sink.as_mut()) {
                    thread_bytes.fetch_add(n as u64, Ordering::Relaxed);
                }
            })
            .map_err(PortError::Io)?;

        Ok(Self {
            stop,
            handle: Some(handle),
            bytes_drained,
        })
    }

    /// Total bytes drained since the listener started.
    pub fn bytes_drained(&self) -> u64 {
        self.bytes_drained.load(Ordering::Relaxed)
    }

    /// Whether the read loop is still alive.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the read loop, wait for it to exit, and return the total bytes
    /// drained over the listener's lifetime.
    ///
    /// The loop performs one last drain on the way out, so output the
    /// device buffered right before the stop request is still observed and
    /// still counted in the returned total.
    pub fn stop(self) -> u64 {
        let bytes_drained = Arc::clone(&self.bytes_drained);
        // Drop joins the thread, which runs the final drain first.
        drop(self);
        bytes_drained.load(Ordering::Relaxed)
    }
}

impl Drop for NotificationListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Drain whatever is currently readable, handing each chunk to `sink`.
///
/// The first read blocks up to the transport's timeout; after data starts
/// flowing, reading continues while the device reports more bytes waiting.
/// Returns the total bytes drained by this call.
fn drain_available(
    transport: &mut dyn SerialTransport,
    buffer: &mut [u8],
    sink: &mut dyn InboundSink,
) -> Result<usize, PortError> {
    let first = transport.read_bytes(buffer)?;
    if first == 0 {
        return Ok(0);
    }
    sink.on_chunk(&buffer[..first]);

    let mut total = first;
    while transport.bytes_to_read().unwrap_or(0) > 0 {
        let n = transport.read_bytes(buffer)?;
        if n == 0 {
            break;
        }
        sink.on_chunk(&buffer[..n]);
        total += n;
    }
    Ok(total)
}
