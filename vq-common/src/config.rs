//! Bootstrap configuration loading and config file resolution
//!
//! Configuration is TOML-only: the queue itself is ephemeral, so there is no
//! runtime settings store. Missing files are not fatal; the built-in defaults
//! are used instead.

use crate::types::QueueConfiguration;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "VQ_CONFIG";

/// Upper bound on queue capacity; slots are scanned linearly
pub const MAX_CAPACITY: usize = 256;

/// Bootstrap configuration loaded from TOML
///
/// These settings cannot change while running, except the queue settings,
/// which only seed the initial replicated configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// HTTP control surface port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Initial queue configuration
    #[serde(default)]
    pub queue: QueueConfiguration,

    /// Buffered signals per peer EventBus
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            logging: LoggingConfig::default(),
            queue: QueueConfiguration::default(),
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_port() -> u16 {
    5750
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_event_capacity() -> usize {
    100
}

impl TomlConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file that must exist
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded TOML configuration from {:?}", path);
        Ok(config)
    }

    /// Load a config file, falling back to defaults when it does not exist
    ///
    /// A file that exists but cannot be parsed or fails validation is still
    /// an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                warn!("Config file {:?} not found, using built-in defaults", path);
                Ok(Self::default())
            }
            None => {
                info!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reject settings the queue cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.queue.capacity == 0 {
            return Err(Error::Config("queue.capacity must be at least 1".to_string()));
        }
        if self.queue.capacity > MAX_CAPACITY {
            return Err(Error::Config(format!(
                "queue.capacity {} exceeds maximum {}",
                self.queue.capacity, MAX_CAPACITY
            )));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Config file resolution in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. Per-user config file, if it exists
///
/// Returns `None` when nothing is configured, meaning built-in defaults.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config file
    default_config_path().filter(|path| path.exists())
}

/// Platform config location, e.g. `~/.config/vq/config.toml` on Linux
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vq").join("config.toml"))
}
