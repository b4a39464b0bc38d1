//! Error types for the Bluetooth mapper
//!
//! Errors are grouped by how the scan loop treats them: discovery failures are
//! transient and retried on the next cycle, storage failures are logged, and
//! configuration failures stop the program before scanning starts.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures while driving the external discovery tool
#[derive(Debug, Error)]
pub enum BluetoothError {
    /// The command could not be started at all
    #[error("Failed to launch '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran but reported failure
    #[error("'{command}' exited with {status}: {stderr}")]
    NonZeroExit {
        command: String,
        status: String,
        stderr: String,
    },

    /// The command did not finish within the configured timeout
    #[error("'{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

/// Failures while writing the device file
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize devices: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Configuration loading and validation failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Failures while reading a snapshot for display
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("No device file at {0}")]
    Missing(PathBuf),

    #[error("Device file {path} is not valid: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] BluetoothError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Viewer error: {0}")]
    Viewer(#[from] ViewerError),
}

/// Where an error happened, attached to log output
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Component that raised the error
    pub component: String,
    /// Operation being performed
    pub operation: String,
    /// Extra key/value details
    pub metadata: HashMap<String, String>,
    /// Message suitable for the person running the tool
    pub user_message: Option<String>,
}

impl ErrorContext {
    pub fn new(component: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            operation: operation.into(),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_user_message(mut self, message: impl Into<String>) -> Self {
        self.user_message = Some(message.into());
        self
    }
}
