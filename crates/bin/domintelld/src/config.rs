//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `domintell.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::path::PathBuf;

use serde::Deserialize;

use domintell_app::config::GatewayConfig;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gateway address and engine timings.
    pub gateway: GatewayConfig,
    /// Snapshot settings.
    pub persistence: PersistenceConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Sensor snapshot configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Restore and persist the sensor store.
    pub enabled: bool,
    /// Snapshot file; `.bin` selects postcard, `.json` selects JSON.
    pub path: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `domintell.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("domintell.toml")?;
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("DOMINTELL_HOST") {
            self.gateway.host = val;
        }
        if let Some(port) = var("DOMINTELL_PORT").and_then(|val| val.parse().ok()) {
            self.gateway.port = port;
        }
        if let Some(val) = var("DOMINTELL_PERSISTENCE_PATH") {
            self.persistence.enabled = true;
            self.persistence.path = PathBuf::from(val);
        }
        if let Some(val) = var("DOMINTELL_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.host.trim().is_empty() {
            return Err(ConfigError::Validation(
                "gateway host must not be empty".to_string(),
            ));
        }
        if self.gateway.port == 0 {
            return Err(ConfigError::Validation(
                "gateway port must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from("domintell.bin"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "domintelld=info,domintell_app=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
