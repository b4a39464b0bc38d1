//! Settings management

mod app_config;

pub use app_config::{
    default_config_path, AppConfig, LogLevel, ScannerConfig, StorageConfig, SystemConfig,
    DEFAULT_COMMAND_TIMEOUT, DEFAULT_SCAN_INTERVAL,
};
pub use crate::error::ConfigError;
