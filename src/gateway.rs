//! High-level SMS gateway API.
//!
//! [`SmsGateway`] ties the other modules together: it resolves the configured
//! port through the registry, acquires the modem, drives the AT command
//! sequence, and releases the port again. One verification message per call,
//! serialized so two callers never interleave frames on the same modem.

use crate::cancel::CancelToken;
use crate::command::message_sequence;
use crate::config::{Config, ModemConfig};
use crate::connection::ModemConnection;
use crate::error::{GatewayError, GatewayResult};
use crate::listener::{InboundSink, TraceSink};
use crate::port::{PortError, PortSettings, SystemOpener, TransportOpener};
use crate::registry::PortRegistry;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Everything the gateway needs to know about the modem it drives.
#[derive(Debug, Clone)]
pub struct ModemProfile {
    /// Port name, matched case-insensitively against enumerated ports
    pub port: String,
    /// Serial line parameters
    pub settings: PortSettings,
    /// How long to keep retrying when another process owns the port
    pub acquire_timeout: Duration,
    /// Pause after mode selection and after message submission
    pub command_settle: Duration,
}

impl Default for ModemProfile {
    fn default() -> Self {
        Self {
            port: "COM3".to_string(),
            settings: PortSettings::default(),
            acquire_timeout: Duration::from_millis(2000),
            command_settle: Duration::from_millis(2000),
        }
    }
}

impl From<&ModemConfig> for ModemProfile {
    fn from(config: &ModemConfig) -> Self {
        Self {
            port: config.port.clone(),
            settings: config.settings(),
            acquire_timeout: config.acquire_timeout(),
            command_settle: config.command_settle(),
        }
    }
}

/// Message template with a single `%s` placeholder for the code.
#[derive(Debug, Clone)]
pub struct MessageTemplate {
    template: String,
}

impl MessageTemplate {
    /// Create a template. Fails if the text has no `%s` placeholder,
    /// which would silently drop the code from every message.
    pub fn new(template: impl Into<String>) -> GatewayResult<Self> {
        let template = template.into();
        if !template.contains("%s") {
            return Err(GatewayError::Template(
                "missing %s placeholder".to_string(),
            ));
        }
        Ok(Self { template })
    }

    /// Substitute the code into the first placeholder.
    pub fn render(&self, code: &str) -> String {
        self.template.replacen("%s", code, 1)
    }

    /// The raw template text.
    pub fn text(&self) -> &str {
        &self.template
    }
}

/// Outcome of a successful delivery attempt.
#[derive(Debug, Clone)]
pub struct SendReport {
    /// Port the message went out on
    pub port: String,
    /// Unsolicited bytes drained from the modem during the session
    pub bytes_drained: u64,
    /// Wall-clock time from port acquisition to hang-up
    pub elapsed: Duration,
}

type SinkFactory = Box<dyn Fn() -> Box<dyn InboundSink> + Send + Sync>;

/// SMS gateway for delivering one-time verification codes over a GSM modem.
///
/// The gateway is `Send + Sync`; clone an [`std::sync::Arc`] around it to
/// share between threads. Sends are serialized internally, so concurrent
/// callers queue up rather than corrupting the command sequence.
pub struct SmsGateway {
    registry: PortRegistry,
    opener: Box<dyn TransportOpener>,
    profile: ModemProfile,
    template: MessageTemplate,
    sink_factory: SinkFactory,
    send_lock: Mutex<()>,
    cancel: CancelToken,
}

impl std::fmt::Debug for SmsGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsGateway")
            .field("port", &self.profile.port)
            .field("template", &self.template.text())
            .finish_non_exhaustive()
    }
}

impl SmsGateway {
    /// Create a gateway with explicit collaborators.
    pub fn new(
        registry: PortRegistry,
        opener: Box<dyn TransportOpener>,
        profile: ModemProfile,
        template: MessageTemplate,
    ) -> Self {
        Self {
            registry,
            opener,
            profile,
            template,
            sink_factory: Box::new(|| Box::new(TraceSink)),
            send_lock: Mutex::new(()),
            cancel: CancelToken::new(),
        }
    }

    /// Create a gateway backed by real system serial ports.
    pub fn from_config(config: &Config) -> GatewayResult<Self> {
        let template = MessageTemplate::new(&config.sms.template)?;
        Ok(Self::new(
            PortRegistry::system(),
            Box::new(SystemOpener),
            ModemProfile::from(&config.modem),
            template,
        ))
    }

    /// Replace the sink used for unsolicited modem output.
    pub fn with_sink_factory(mut self, factory: SinkFactory) -> Self {
        self.sink_factory = factory;
        self
    }

    /// Token observed by every in-flight and future send.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Cancel any in-flight send and refuse new ones. Terminal.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        info!("Gateway shutdown requested");
    }

    /// Deliver a verification code to a phone number.
    ///
    /// Validates the number and rendered message, acquires the modem port,
    /// runs the full AT sequence, and hangs up. The port is released even
    /// when a command in the middle of the sequence fails.
    pub fn send(&self, number: &str, code: &str) -> GatewayResult<SendReport> {
        let _guard = self.send_lock.lock();

        if self.cancel.is_cancelled() {
            return Err(PortError::Cancelled.into());
        }

        // Validate everything before touching the port.
        let message = self.template.render(code);
        let commands = message_sequence(number, &message, self.profile.command_settle)?;
        let descriptor = self.registry.resolve(&self.profile.port)?;

        let start = Instant::now();
        let mut connection = ModemConnection::open(
            self.opener.as_ref(),
            &descriptor.name,
            &self.profile.settings,
            self.profile.acquire_timeout,
            &self.cancel,
            (self.sink_factory)(),
        )?;

        let result = connection.channel(&self.cancel).run(&commands);
        let port = connection.port_name().to_string();
        // Closing joins the listener after its final sweep, so the count
        // covers everything the modem said during the session.
        let bytes_drained = connection.close();
        result?;

        let elapsed = start.elapsed();
        info!(
            number = %mask_phone_number(number),
            port = %port,
            bytes_drained,
            elapsed_ms = elapsed.as_millis() as u64,
            "Message sent"
        );

        Ok(SendReport {
            port,
            bytes_drained,
            elapsed,
        })
    }

    /// Like [`send`](Self::send) but collapses failures to `false` after
    /// logging them. Suits callers that only branch on delivery success.
    pub fn try_send(&self, number: &str, code: &str) -> bool {
        match self.send(number, code) {
            Ok(_) => true,
            Err(err) => {
                error!(number = %mask_phone_number(number), %err, "Message delivery failed");
                false
            }
        }
    }
}

/// Mask a phone number for logging, keeping the last four characters.
fn mask_phone_number(number: &str) -> String {
    let len = number.chars().count();
    if len <= 4 {
        return "*".repeat(len);
    }
    let masked = len - 4;
    let mut out = "*".repeat(masked);
    out.extend(number.chars().skip(masked));
    out
}
