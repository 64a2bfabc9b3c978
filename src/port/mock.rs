//! Mock serial transport for testing.
//!
//! Provides a `MockSerialPort` that simulates modem behavior without
//! requiring actual hardware. Supports configurable read queues, write
//! logging, failure injection, and expectation verification.

use super::error::PortError;
use super::traits::{PortSettings, SerialTransport, TransportOpener};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Inner state of the mock port, protected by a mutex for interior mutability.
#[derive(Debug, Default)]
struct MockPortState {
    /// Queue of bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Log of all bytes written to the port.
    write_log: Vec<Vec<u8>>,
    /// Expected write operations (for verification).
    expected_writes: VecDeque<Vec<u8>>,
    /// Zero-based index of the write call that should fail, if any.
    fail_write_at: Option<usize>,
    /// Number of write calls seen so far, including the failed one.
    writes_attempted: usize,
    /// When set, successful writes are reflected into the read queue.
    echo: bool,
    /// Configured timeout duration.
    timeout: Duration,
    /// Whether buffers have been cleared.
    buffers_cleared: bool,
}

/// Mock serial transport for testing.
///
/// This implementation allows you to:
/// - Enqueue data to be returned by read operations
/// - Inspect what data was written
/// - Set expectations for write operations
/// - Inject a write failure at a chosen point in the command sequence
///
/// Clones share state, matching how a cloned handle onto a real port
/// still talks to the same device.
///
/// # Example
/// ```
/// use sms_gateway::port::{MockSerialPort, SerialTransport};
///
/// let mut port = MockSerialPort::new("MOCK0");
///
/// // Enqueue modem chatter to be read
/// port.enqueue_read(b"OK\r\n");
///
/// // Perform a read
/// let mut buffer = [0u8; 4];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(n, 4);
/// assert_eq!(&buffer[..n], b"OK\r\n");
///
/// // Write a command
/// port.write_bytes(b"ATZ\r\n").unwrap();
///
/// // Verify what was written
/// let writes = port.get_write_log();
/// assert_eq!(writes.len(), 1);
/// assert_eq!(writes[0], b"ATZ\r\n");
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    /// The port name/identifier.
    name: String,
    /// The internal state, wrapped in Arc<Mutex<>> for interior mutability.
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState {
                timeout: Duration::from_secs(1),
                ..Default::default()
            })),
        }
    }

    /// Enqueue bytes to be returned by subsequent read operations.
    ///
    /// The bytes are added to the end of the read queue.
    pub fn enqueue_read(&self, data: &[u8]) {
        let mut state = self.state.lock().unwrap();
        state.read_queue.extend(data);
    }

    /// Expect a specific write operation.
    ///
    /// This adds an expectation that the given data will be written.
    /// Use `verify_expectations()` to check that all expected writes occurred.
    pub fn expect_write(&self, data: &[u8]) {
        let mut state = self.state.lock().unwrap();
        state.expected_writes.push_back(data.to_vec());
    }

    /// Verify that all expected writes have occurred in order.
    ///
    /// Returns `Ok(())` if all expectations were met, or an error describing
    /// what was expected vs. what actually happened.
    pub fn verify_expectations(&self) -> Result<(), String> {
        let state = self.state.lock().unwrap();

        if !state.expected_writes.is_empty() {
            return Err(format!(
                "Expected {} more write(s), but none occurred",
                state.expected_writes.len()
            ));
        }

        Ok(())
    }

    /// Get a copy of all data written to the port, one entry per write call.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state.write_log.clone()
    }

    /// All written bytes concatenated in order.
    ///
    /// Useful for asserting the exact byte stream a command sequence put on
    /// the wire without caring how it was chunked.
    pub fn joined_writes(&self) -> Vec<u8> {
        let state = self.state.lock().unwrap();
        state.write_log.iter().flatten().copied().collect()
    }

    /// Clear the write log.
    pub fn clear_write_log(&self) {
        let mut state = self.state.lock().unwrap();
        state.write_log.clear();
    }

    /// Make the `index`-th write call (zero-based) fail with an I/O error.
    ///
    /// The failed write is not recorded in the write log.
    pub fn fail_write_at(&self, index: usize) {
        let mut state = self.state.lock().unwrap();
        state.fail_write_at = Some(index);
    }

    /// Reflect every successful write back into the read queue.
    ///
    /// Models a modem with command echo enabled, the factory default on
    /// most GSM dongles.
    pub fn set_echo(&self, on: bool) {
        let mut state = self.state.lock().unwrap();
        state.echo = on;
    }

    /// Number of write calls attempted, including any injected failure.
    pub fn writes_attempted(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.writes_attempted
    }

    /// Get whether buffers have been cleared since the last reset.
    pub fn was_cleared(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.buffers_cleared
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.read_queue.len()
    }

    /// The most recently configured timeout.
    pub fn current_timeout(&self) -> Duration {
        let state = self.state.lock().unwrap();
        state.timeout
    }
}

impl SerialTransport for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock().unwrap();

        let index = state.writes_attempted;
        state.writes_attempted += 1;

        if state.fail_write_at == Some(index) {
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "injected write failure",
            )));
        }

        state.write_log.push(data.to_vec());
        if state.echo {
            state.read_queue.extend(data.iter().copied());
        }

        // Check expectations if any exist
        if let Some(expected) = state.expected_writes.pop_front() {
            if expected != data {
                return Err(PortError::unsupported(format!(
                    "Expected write: {:?}, got: {:?}",
                    expected, data
                )));
            }
        }

        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock().unwrap();

        // Drain as many bytes as possible from the queue
        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            if let Some(queued_byte) = state.read_queue.pop_front() {
                *byte = queued_byte;
                bytes_read += 1;
            } else {
                break;
            }
        }

        // An empty queue reads as a timed-out poll, same as the real port.
        Ok(bytes_read)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
        let mut state = self.state.lock().unwrap();
        state.timeout = timeout;
        Ok(())
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        let mut state = self.state.lock().unwrap();
        state.read_queue.clear();
        state.buffers_cleared = true;
        Ok(())
    }

    fn bytes_to_read(&self) -> Option<usize> {
        let state = self.state.lock().unwrap();
        Some(state.read_queue.len())
    }

    fn try_clone(&self) -> Result<Box<dyn SerialTransport>, PortError> {
        Ok(Box::new(self.clone()))
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}

/// [`TransportOpener`] that hands out clones of one [`MockSerialPort`],
/// optionally failing a scripted number of attempts first.
///
/// Lets tests exercise contention and open-failure paths without hardware:
/// every handle the opener produces shares the underlying mock's state, so
/// writes are observable no matter which open attempt succeeded. Clones of
/// the opener share the failure script and the attempt records, so a test
/// can keep one handle while the code under test owns the other.
#[derive(Debug, Clone)]
pub struct MockOpener {
    port: MockSerialPort,
    state: Arc<OpenerState>,
}

#[derive(Debug, Default)]
struct OpenerState {
    /// Errors handed out before opens start succeeding.
    scripted_failures: Mutex<VecDeque<PortError>>,
    /// Open attempts observed, including scripted failures.
    attempts: AtomicUsize,
    /// Line settings received, one entry per open attempt.
    seen_settings: Mutex<Vec<PortSettings>>,
}

impl MockOpener {
    /// Opener that always succeeds with clones of `port`.
    pub fn new(port: MockSerialPort) -> Self {
        Self {
            port,
            state: Arc::new(OpenerState::default()),
        }
    }

    /// Queue an error to be returned by the next open attempt.
    ///
    /// Queued errors are consumed in order before opens start succeeding.
    pub fn fail_next(&self, error: PortError) {
        self.state.scripted_failures.lock().unwrap().push_back(error);
    }

    /// Number of open attempts observed so far.
    pub fn attempts(&self) -> usize {
        self.state.attempts.load(Ordering::Relaxed)
    }

    /// The line settings the most recent open attempt received.
    ///
    /// `None` until the first attempt. Lets tests verify that configured
    /// settings actually reach the device instead of being rebuilt from
    /// defaults somewhere along the way.
    pub fn last_settings(&self) -> Option<PortSettings> {
        self.state.seen_settings.lock().unwrap().last().cloned()
    }

    /// The shared mock port behind every successful open.
    pub fn port(&self) -> &MockSerialPort {
        &self.port
    }
}

impl TransportOpener for MockOpener {
    fn open_transport(
        &self,
        _port_name: &str,
        settings: &PortSettings,
    ) -> Result<Box<dyn SerialTransport>, PortError> {
        self.state.attempts.fetch_add(1, Ordering::Relaxed);
        self.state
            .seen_settings
            .lock()
            .unwrap()
            .push(settings.clone());
        if let Some(error) = self.state.scripted_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(Box::new(self.port.clone()))
    }
}
