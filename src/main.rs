//! Command-line entry point for the SMS gateway.
//!
//! One-shot operation: load configuration, acquire the modem, send a single
//! verification message, release the port, exit. Use `--list-ports` to see
//! what the registry detects without touching any port.

use clap::Parser;
use sms_gateway::config::{Config, ConfigLoader, LogFormat};
use sms_gateway::registry::PortRegistry;
use sms_gateway::SmsGateway;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "sms_gateway",
    version,
    about = "Send one-time verification codes through a GSM modem",
    long_about = "Drives a GSM modem attached to a serial port using text-mode AT \
commands. The recipient number and verification code are substituted into the \
configured message template; the port is acquired for the duration of the send \
and released afterwards."
)]
struct Args {
    /// Recipient phone number (digits, optional leading +)
    #[arg(short, long, required_unless_present = "list_ports")]
    number: Option<String>,

    /// Verification code substituted into the message template
    #[arg(short, long, required_unless_present = "list_ports")]
    code: Option<String>,

    /// Explicit configuration file path
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Serial port of the modem, overriding the configured one
    #[arg(short, long)]
    port: Option<String>,

    /// List detected serial ports and exit
    #[arg(short, long)]
    list_ports: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config);

    if args.list_ports {
        return list_ports();
    }

    // clap enforces presence of both unless --list-ports was given
    let (number, code) = match (args.number, args.code) {
        (Some(number), Some(code)) => (number, code),
        _ => {
            eprintln!("Both --number and --code are required to send a message");
            return ExitCode::FAILURE;
        }
    };

    if let Some(port) = args.port {
        config.modem.port = port;
    }

    let gateway = match SmsGateway::from_config(&config) {
        Ok(gateway) => gateway,
        Err(err) => {
            eprintln!("Gateway setup failed: {}", err);
            return ExitCode::FAILURE;
        }
    };

    // Stdout carries only the one-word outcome; details go to the log.
    if gateway.try_send(&number, &code) {
        println!("SUCCESS");
        ExitCode::SUCCESS
    } else {
        println!("FAILED");
        ExitCode::FAILURE
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, sms_gateway::ConfigError> {
    let loader = match path {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    Ok(loader.into_config())
}

/// `RUST_LOG` wins over the configured level so a one-off debug run never
/// needs a config edit. Logs go to stderr; stdout is reserved for the
/// outcome line.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn list_ports() -> ExitCode {
    match PortRegistry::system().enumerate() {
        Ok(ports) if ports.is_empty() => {
            println!("No serial ports detected.");
            ExitCode::SUCCESS
        }
        Ok(ports) => {
            for port in &ports {
                println!("{:<16} {}", port.name, port.kind);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Failed to enumerate ports: {}", err);
            ExitCode::FAILURE
        }
    }
}
