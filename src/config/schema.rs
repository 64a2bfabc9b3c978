//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use crate::port::{DataBits, FlowControl, Parity, PortSettings, StopBits};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Modem and serial line configuration
    pub modem: ModemConfig,
    /// Message content configuration
    pub sms: SmsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Modem configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModemConfig {
    /// Serial port the GSM modem is attached to
    pub port: String,
    /// Baud rate (bits per second)
    pub baud_rate: u32,
    /// Number of data bits (5-8)
    pub data_bits: DataBits,
    /// Number of stop bits (1 or 2)
    pub stop_bits: StopBits,
    /// Parity: "none", "odd", "even"
    pub parity: Parity,
    /// Flow control: "none", "software", "hardware"
    pub flow_control: FlowControl,
    /// How long to keep retrying while another process holds the port
    pub acquire_timeout_ms: u64,
    /// Settle delay after mode switches and message submission
    pub command_settle_ms: u64,
    /// Read/write timeout on the open port
    pub io_timeout_ms: u64,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            port: "COM3".to_string(),
            baud_rate: 115_200,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::Hardware,
            acquire_timeout_ms: 2000,
            command_settle_ms: 2000,
            io_timeout_ms: 1000,
        }
    }
}

impl ModemConfig {
    /// Line settings for opening the port.
    pub fn settings(&self) -> PortSettings {
        PortSettings {
            baud_rate: self.baud_rate,
            data_bits: self.data_bits,
            flow_control: self.flow_control,
            parity: self.parity,
            stop_bits: self.stop_bits,
            timeout: Duration::from_millis(self.io_timeout_ms),
        }
    }

    /// Get the acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Get the command settle delay as Duration
    pub fn command_settle(&self) -> Duration {
        Duration::from_millis(self.command_settle_ms)
    }
}

/// Message content configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmsConfig {
    /// Message template; `%s` is replaced with the verification code
    pub template: String,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            template: "Your verification code is %s.".to_string(),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.modem.port, "COM3");
        assert_eq!(config.modem.baud_rate, 115_200);
        assert_eq!(config.modem.flow_control, FlowControl::Hardware);
        assert_eq!(config.modem.acquire_timeout_ms, 2000);
        assert_eq!(config.modem.command_settle_ms, 2000);
        assert!(config.sms.template.contains("%s"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_settings_from_modem_section() {
        let config = ModemConfig::default();
        let settings = config.settings();
        assert_eq!(settings.baud_rate, 115_200);
        assert_eq!(settings.data_bits, DataBits::Eight);
        assert_eq!(settings.stop_bits, StopBits::One);
        assert_eq!(settings.parity, Parity::None);
        assert_eq!(settings.timeout, Duration::from_millis(1000));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[modem]"));
        assert!(toml_str.contains("[sms]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [modem]
            port = "/dev/ttyUSB0"
            baud_rate = 9600
            data_bits = 7
            parity = "even"
            flow_control = "none"

            [sms]
            template = "Code: %s"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.modem.port, "/dev/ttyUSB0");
        assert_eq!(config.modem.baud_rate, 9600);
        assert_eq!(config.modem.data_bits, DataBits::Seven);
        assert_eq!(config.modem.parity, Parity::Even);
        assert_eq!(config.modem.flow_control, FlowControl::None);
        assert_eq!(config.sms.template, "Code: %s");
        // Defaults should still work
        assert_eq!(config.modem.stop_bits, StopBits::One);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_out_of_range_data_bits_rejected() {
        let toml_str = r#"
            [modem]
            data_bits = 9
        "#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }
}
