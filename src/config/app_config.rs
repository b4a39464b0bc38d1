use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Default pause between scan cycles
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(3);

/// Default upper bound for a single discovery tool invocation
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest accepted pause between cycles
const MAX_SCAN_INTERVAL: Duration = Duration::from_secs(3600);

/// Longest accepted command timeout
const MAX_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Discovery tool and polling settings
    pub scanner: ScannerConfig,
    /// Device file settings
    pub storage: StorageConfig,
    /// Logging settings
    pub system: SystemConfig,
}

/// Scanner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Executable used for discovery
    pub command: String,

    /// Pause between cycles, in seconds
    #[serde(with = "duration_secs")]
    pub scan_interval: Duration,

    /// Timeout per tool invocation, in seconds
    #[serde(with = "duration_secs")]
    pub command_timeout: Duration,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            command: "bluetoothctl".to_string(),
            scan_interval: DEFAULT_SCAN_INTERVAL,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

/// Device file settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON document shared with the viewer
    pub devices_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            devices_path: PathBuf::from("bluetooth_devices.json"),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub log_level: LogLevel,
    /// Optional file that receives a plain copy of the log
    pub log_file: Option<PathBuf>,
    /// Debug categories to enable (bluetooth, registry, config, system, all)
    pub debug_categories: Vec<String>,
}

/// Log verbosity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(name)
    }
}

impl AppConfig {
    /// Load configuration from a file, falling back to defaults when it is absent
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&contents)?;
        config.validate()?;

        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration as pretty JSON, creating the parent directory
    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Check that every value is within its accepted range
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scanner = &self.scanner;

        if scanner.command.trim().is_empty() {
            return Err(ConfigError::Invalid("scanner command must not be empty".to_string()));
        }
        if scanner.scan_interval.is_zero() || scanner.scan_interval > MAX_SCAN_INTERVAL {
            return Err(ConfigError::Invalid(format!(
                "scan interval must be between 1 and {} seconds",
                MAX_SCAN_INTERVAL.as_secs()
            )));
        }
        if scanner.command_timeout.is_zero() || scanner.command_timeout > MAX_COMMAND_TIMEOUT {
            return Err(ConfigError::Invalid(format!(
                "command timeout must be between 1 and {} seconds",
                MAX_COMMAND_TIMEOUT.as_secs()
            )));
        }
        if self.storage.devices_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("devices path must not be empty".to_string()));
        }

        Ok(())
    }
}

/// Get the default configuration path
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|config_dir| config_dir.join("bluetooth-mapper").join("config.json"))
        .unwrap_or_else(|| PathBuf::from("config.json"))
}

/// Whole-second (de)serialization for durations
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
