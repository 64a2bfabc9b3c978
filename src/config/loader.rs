//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "SMS_GATEWAY";

/// Config file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "SMS_GATEWAY_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `SMS_GATEWAY_CONFIG` environment variable (explicit path)
    /// 2. `./config.toml` (current directory)
    /// 3. `~/.config/sms-gateway/config.toml` (XDG on Linux/macOS)
    /// 4. `%APPDATA%\sms-gateway\config.toml` (Windows)
    /// 5. Built-in defaults (no file required)
    ///
    /// Environment variables can override any config file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = if let Some(ref path) = config_path {
            load_from_file(path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        // Still apply env overrides even with defaults
        let _ = apply_env_overrides(&mut config);

        Self {
            config_path: None,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. XDG config directory (Linux/macOS) or APPDATA (Windows)
    if let Some(config_dir) = get_config_dir() {
        let app_config = config_dir.join("sms-gateway").join(CONFIG_FILE_NAME);
        if app_config.exists() {
            return Some(app_config);
        }
    }

    // 4. No config file found - will use defaults
    None
}

/// Get the platform-specific config directory.
fn get_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `SMS_GATEWAY_<SECTION>_<KEY>`
/// For example:
/// - `SMS_GATEWAY_MODEM_PORT=/dev/ttyUSB0`
/// - `SMS_GATEWAY_MODEM_BAUD_RATE=9600`
/// - `SMS_GATEWAY_SMS_TEMPLATE="Code: %s"`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Modem overrides
    if let Ok(val) = std::env::var(format!("{}_MODEM_PORT", ENV_PREFIX)) {
        config.modem.port = val;
    }
    if let Ok(val) = std::env::var(format!("{}_MODEM_BAUD_RATE", ENV_PREFIX)) {
        config.modem.baud_rate = val.parse().map_err(|_| {
            ConfigError::env_parse(format!("{}_MODEM_BAUD_RATE", ENV_PREFIX), "Invalid baud rate")
        })?;
    }
    if let Ok(val) = std::env::var(format!("{}_MODEM_ACQUIRE_TIMEOUT_MS", ENV_PREFIX)) {
        config.modem.acquire_timeout_ms = val.parse().map_err(|_| {
            ConfigError::env_parse(
                format!("{}_MODEM_ACQUIRE_TIMEOUT_MS", ENV_PREFIX),
                "Invalid timeout",
            )
        })?;
    }
    if let Ok(val) = std::env::var(format!("{}_MODEM_COMMAND_SETTLE_MS", ENV_PREFIX)) {
        config.modem.command_settle_ms = val.parse().map_err(|_| {
            ConfigError::env_parse(
                format!("{}_MODEM_COMMAND_SETTLE_MS", ENV_PREFIX),
                "Invalid settle delay",
            )
        })?;
    }

    // SMS overrides
    if let Ok(val) = std::env::var(format!("{}_SMS_TEMPLATE", ENV_PREFIX)) {
        config.sms.template = val;
    }

    // Logging overrides
    if let Ok(val) = std::env::var(format!("{}_LOGGING_LEVEL", ENV_PREFIX)) {
        config.logging.level = val;
    }

    Ok(())
}

/// Reject configurations that cannot possibly drive a modem.
fn validate(config: &Config) -> ConfigResult<()> {
    if config.modem.port.trim().is_empty() {
        return Err(ConfigError::validation(
            "modem.port",
            "port name must not be empty",
        ));
    }
    if config.modem.baud_rate == 0 {
        return Err(ConfigError::validation(
            "modem.baud_rate",
            "baud rate must be non-zero",
        ));
    }
    if !config.sms.template.contains("%s") {
        return Err(ConfigError::validation(
            "sms.template",
            "template must contain a %s placeholder for the code",
        ));
    }
    Ok(())
}
