//! Device file persistence
//!
//! The whole registry is rewritten after every scan cycle. Writes go to a
//! sibling temporary file which is then renamed over the target, so a reader
//! never sees a half-written document.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::registry::{DeviceRecord, Registry};

/// Reads and writes the JSON device file
#[derive(Debug, Clone)]
pub struct DeviceStore {
    path: PathBuf,
}

impl DeviceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registry, starting empty when the file is absent or unreadable
    pub fn load(&self) -> Registry {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("No device file at {}, starting empty", self.path.display());
                return Registry::new();
            }
            Err(e) => {
                log::warn!("Could not read {}: {}; starting empty", self.path.display(), e);
                return Registry::new();
            }
        };

        if contents.trim().is_empty() {
            return Registry::new();
        }

        match serde_json::from_str::<Vec<DeviceRecord>>(&contents) {
            Ok(records) => {
                let registry = Registry::from_records(records);
                log::info!(
                    "Loaded {} known devices from {}",
                    registry.len(),
                    self.path.display()
                );
                registry
            }
            Err(e) => {
                log::warn!(
                    "Device file {} is not valid JSON ({}); starting empty",
                    self.path.display(),
                    e
                );
                Registry::new()
            }
        }
    }

    /// Replace the device file with the full registry
    pub fn save(&self, registry: &Registry) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(&registry.to_records())?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| self.io_error(parent, source))?;
            }
        }

        let temp_path = self.temp_path();
        let write_result = (|| {
            let mut file = File::create(&temp_path)?;
            file.write_all(json.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()
        })();

        if let Err(source) = write_result {
            let _ = fs::remove_file(&temp_path);
            return Err(self.io_error(&temp_path, source));
        }

        fs::rename(&temp_path, &self.path).map_err(|source| {
            let _ = fs::remove_file(&temp_path);
            self.io_error(&self.path, source)
        })?;

        log::info!("Device file updated with {} devices", registry.len());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "devices.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
