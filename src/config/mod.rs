//! Configuration module for the SMS gateway.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `SMS_GATEWAY_CONFIG` environment variable (explicit path)
//! 2. `./config.toml` (current directory)
//! 3. `~/.config/sms-gateway/config.toml` (XDG on Linux/macOS)
//! 4. `%APPDATA%\sms-gateway\config.toml` (Windows)
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Individual configuration values can be overridden via environment variables.
//! The pattern is: `SMS_GATEWAY_<SECTION>_<KEY>`
//!
//! Examples:
//! - `SMS_GATEWAY_MODEM_PORT=/dev/ttyUSB0`
//! - `SMS_GATEWAY_MODEM_BAUD_RATE=9600`
//! - `SMS_GATEWAY_SMS_TEMPLATE="Code: %s"`
//!
//! # Example
//!
//! ```rust,ignore
//! use sms_gateway::config::ConfigLoader;
//!
//! // Load configuration with automatic resolution
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//!
//! println!("Modem port: {}", config.modem.port);
//! println!("Baud rate: {}", config.modem.baud_rate);
//!
//! // Or load with defaults only
//! let loader = ConfigLoader::with_defaults();
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{resolve_config_path, ConfigLoader};
pub use schema::{Config, LogFormat, LoggingConfig, ModemConfig, SmsConfig};
