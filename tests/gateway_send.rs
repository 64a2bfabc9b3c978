//! Integration tests for the gateway send path
//!
//! These drive the full stack against the mock transport:
//! - Exact wire bytes for the complete AT command sequence
//! - Port resolution, contention, and mid-sequence failures
//! - Serialization of concurrent sends sharing one gateway
//! - Draining of unsolicited modem output during a send
//! - Shutdown semantics

use pretty_assertions::assert_eq;
use sms_gateway::gateway::{MessageTemplate, ModemProfile, SmsGateway};
use sms_gateway::listener::CaptureSink;
use sms_gateway::port::mock::{MockOpener, MockSerialPort};
use sms_gateway::port::PortSettings;
use sms_gateway::registry::{PortDescriptor, PortKind, PortRegistry};
use sms_gateway::{GatewayError, PortError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Template the deployed verification service uses.
const VERIFICATION_TEMPLATE: &str = "This message is from Blue Cross: Your Verification code is %s. \
Please show this message to your TPA to verify your account.";

fn profile(port: &str, settle: Duration) -> ModemProfile {
    ModemProfile {
        port: port.to_string(),
        settings: PortSettings::default(),
        acquire_timeout: Duration::from_millis(500),
        command_settle: settle,
    }
}

fn registry_with(names: &[&str]) -> PortRegistry {
    PortRegistry::fixed(
        names
            .iter()
            .map(|n| PortDescriptor::new(*n, PortKind::Unknown))
            .collect(),
    )
}

fn gateway_on_mock(template: &str, settle: Duration) -> (SmsGateway, MockSerialPort) {
    let mock = MockSerialPort::new("COM3");
    let gateway = SmsGateway::new(
        registry_with(&["COM3"]),
        Box::new(MockOpener::new(mock.clone())),
        profile("COM3", settle),
        MessageTemplate::new(template).expect("valid template"),
    );
    (gateway, mock)
}

// ============================================================================
// Wire format
// ============================================================================

#[test]
fn full_sequence_bytes_for_verification_message() {
    // The scenario the service runs in production: verification code "test"
    // to a Philippine mobile number, with the tenant's message template.
    let (gateway, mock) = gateway_on_mock(VERIFICATION_TEMPLATE, Duration::ZERO);

    let report = gateway
        .send("09297700500", "test")
        .expect("send should succeed");

    let expected = "ATZ\r\n\
                    AT+CREG?\r\n\
                    AT+CMGF=1\r\n\
                    AT+CMGS=\"09297700500\"\r\
                    This message is from Blue Cross: Your Verification code is test. \
                    Please show this message to your TPA to verify your account.\x1A\
                    ATH\r\n";
    assert_eq!(
        String::from_utf8(mock.joined_writes()).expect("frames are ASCII"),
        expected
    );
    assert_eq!(report.port, "COM3");
}

#[test]
fn sequence_is_five_frames_with_single_submit_write() {
    let (gateway, mock) = gateway_on_mock("Your code: %s", Duration::ZERO);

    gateway.send("+6391234567", "8842").expect("send");

    // Address, body, and terminator must leave in one write call so no
    // other traffic can split the submit frame.
    let log = mock.get_write_log();
    assert_eq!(log.len(), 5);
    assert_eq!(log[0], b"ATZ\r\n");
    assert_eq!(log[1], b"AT+CREG?\r\n");
    assert_eq!(log[2], b"AT+CMGF=1\r\n");
    assert_eq!(log[3], b"AT+CMGS=\"+6391234567\"\rYour code: 8842\x1a");
    assert_eq!(log[4], b"ATH\r\n");
}

#[test]
fn submit_frame_has_no_trailing_newline() {
    let (gateway, mock) = gateway_on_mock("%s", Duration::ZERO);

    gateway.send("5551234", "1").expect("send");

    let log = mock.get_write_log();
    let submit = &log[3];
    assert_eq!(submit.last(), Some(&0x1au8));
    // The address line ends in a bare carriage return, never CRLF.
    assert!(!submit.windows(2).any(|w| w == b"\r\n"));
}

// ============================================================================
// Failure paths
// ============================================================================

#[test]
fn unknown_port_writes_nothing() {
    let mock = MockSerialPort::new("COM9");
    let gateway = SmsGateway::new(
        registry_with(&["COM9"]),
        Box::new(MockOpener::new(mock.clone())),
        profile("COM4", Duration::ZERO),
        MessageTemplate::new("%s").expect("valid template"),
    );

    let result = gateway.send("5551234", "1");

    assert!(matches!(
        result,
        Err(GatewayError::Port(PortError::NotFound(_)))
    ));
    assert!(mock.get_write_log().is_empty());
}

#[test]
fn contended_port_gives_up_after_acquire_timeout() {
    let mock = MockSerialPort::new("COM3");
    let opener = MockOpener::new(mock.clone());
    // More scripted failures than the retry loop can consume.
    for _ in 0..32 {
        opener.fail_next(PortError::busy("COM3", Duration::ZERO));
    }
    let mut busy_profile = profile("COM3", Duration::ZERO);
    busy_profile.acquire_timeout = Duration::from_millis(150);
    let gateway = SmsGateway::new(
        registry_with(&["COM3"]),
        Box::new(opener),
        busy_profile,
        MessageTemplate::new("%s").expect("valid template"),
    );

    let result = gateway.send("5551234", "1");

    match result {
        Err(GatewayError::Port(PortError::Busy { port, waited })) => {
            assert_eq!(port, "COM3");
            assert!(
                waited >= Duration::from_millis(150),
                "reported wait {waited:?} shorter than the acquire timeout"
            );
        }
        other => panic!("expected busy error, got {other:?}"),
    }
    assert!(mock.get_write_log().is_empty());
}

#[test]
fn write_failure_mid_sequence_stops_remaining_frames() {
    let (gateway, mock) = gateway_on_mock("%s", Duration::ZERO);
    // Third frame (mode select) refuses; hang-up must not be attempted.
    mock.fail_write_at(2);

    assert!(!gateway.try_send("5551234", "1"));
    assert_eq!(mock.get_write_log().len(), 2);
    assert_eq!(mock.writes_attempted(), 3);
}

#[test]
fn invalid_recipient_rejected_before_port_open() {
    let (gateway, mock) = gateway_on_mock("%s", Duration::ZERO);

    assert!(!gateway.try_send("555-1234", "1"));
    assert!(!gateway.try_send("", "1"));
    assert!(!gateway.try_send("+", "1"));
    assert!(mock.get_write_log().is_empty());
}

#[test]
fn oversized_rendered_message_rejected() {
    let (gateway, mock) = gateway_on_mock("%s", Duration::ZERO);
    let code = "9".repeat(200);

    let result = gateway.send("5551234", &code);

    assert!(matches!(result, Err(GatewayError::Frame(_))));
    assert!(mock.get_write_log().is_empty());
}

// ============================================================================
// Concurrency and lifecycle
// ============================================================================

#[test]
fn concurrent_sends_never_interleave_frames() {
    let (gateway, mock) = gateway_on_mock("Code %s", Duration::ZERO);
    let gateway = Arc::new(gateway);

    let handles: Vec<_> = ["1111", "2222"]
        .into_iter()
        .map(|code| {
            let gateway = Arc::clone(&gateway);
            thread::spawn(move || gateway.try_send("5551234", code))
        })
        .collect();
    for handle in handles {
        assert!(handle.join().expect("send thread panicked"));
    }

    // Ten frames total, and each half is one complete, uninterrupted
    // sequence from reset through hang-up.
    let log = mock.get_write_log();
    assert_eq!(log.len(), 10);
    for sequence in log.chunks(5) {
        assert_eq!(sequence[0], b"ATZ\r\n");
        assert_eq!(sequence[1], b"AT+CREG?\r\n");
        assert_eq!(sequence[2], b"AT+CMGF=1\r\n");
        assert!(sequence[3].starts_with(b"AT+CMGS=\"5551234\"\r"));
        assert_eq!(sequence[4], b"ATH\r\n");
    }
    let submits: Vec<String> = vec![
        String::from_utf8_lossy(&log[3]).into_owned(),
        String::from_utf8_lossy(&log[8]).into_owned(),
    ];
    assert!(submits.iter().any(|s| s.contains("Code 1111")));
    assert!(submits.iter().any(|s| s.contains("Code 2222")));
}

#[test]
fn unsolicited_output_is_drained_while_sending() {
    let (gateway, mock) = gateway_on_mock("%s", Duration::from_millis(100));
    let sink = CaptureSink::new();
    let handle = sink.clone();
    let gateway = gateway.with_sink_factory(Box::new(move || Box::new(sink.clone())));

    // Chatter sitting in the buffer at open time is cleared, so feed the
    // queue shortly after the sequence starts. The two settle pauses leave
    // the listener ample time to pick it up before hang-up.
    let feeder = {
        let mock = mock.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            mock.enqueue_read(b"RING\r\n");
            mock.enqueue_read(b"+CREG: 0,1\r\n");
        })
    };

    let report = gateway.send("5551234", "1").expect("send");
    feeder.join().expect("feeder thread panicked");

    assert_eq!(
        String::from_utf8(handle.captured()).expect("chatter is ASCII"),
        "RING\r\n+CREG: 0,1\r\n"
    );
    assert_eq!(report.bytes_drained, 18);
}

#[test]
fn echoed_commands_are_fully_drained() {
    let (gateway, mock) = gateway_on_mock("%s", Duration::ZERO);
    mock.set_echo(true);
    let sink = CaptureSink::new();
    let handle = sink.clone();
    let gateway = gateway.with_sink_factory(Box::new(move || Box::new(sink.clone())));

    let report = gateway.send("5551234", "7").expect("send");

    // Releasing the port joins the listener after a final drain, so the
    // full echo of every frame has been observed, hang-up included.
    assert_eq!(
        String::from_utf8(handle.captured()).expect("echo is ASCII"),
        String::from_utf8(mock.joined_writes()).expect("frames are ASCII")
    );
    // The reported count covers that final drain too; with zero settle the
    // hang-up echo can only be picked up on the way down.
    assert_eq!(report.bytes_drained as usize, mock.joined_writes().len());
}

#[test]
fn buffers_cleared_before_first_command() {
    let (gateway, mock) = gateway_on_mock("%s", Duration::ZERO);

    gateway.send("5551234", "1").expect("send");

    assert!(mock.was_cleared());
}

#[test]
fn shutdown_is_terminal() {
    let (gateway, mock) = gateway_on_mock("%s", Duration::ZERO);

    gateway.shutdown();
    // A second shutdown is a no-op, not a panic.
    gateway.shutdown();

    let result = gateway.send("5551234", "1");
    assert!(matches!(
        result,
        Err(GatewayError::Port(PortError::Cancelled))
    ));
    assert!(mock.get_write_log().is_empty());
}
