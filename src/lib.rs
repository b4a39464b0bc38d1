//! Bluetooth mapper
//!
//! Periodically asks the system Bluetooth tool which devices are visible,
//! records each device's address, name and signal strength in a JSON file,
//! and renders that file as a list sorted by signal strength.

pub mod bluetooth;
pub mod config;
pub mod error;
pub mod lifecycle_manager;
pub mod logging;
pub mod registry;
pub mod scan_controller;
pub mod signal;
pub mod viewer;

// Re-exports for convenience
pub use bluetooth::{BluetoothCtl, DiscoveryTool};
pub use config::AppConfig;
pub use error::{AppError, BluetoothError, ErrorContext, StorageError};
pub use lifecycle_manager::{install_ctrlc_handler, shutdown_channel, ShutdownSignal, ShutdownTrigger};
pub use registry::{DeviceRecord, DeviceStore, MergeOutcome, Observation, Registry};
pub use scan_controller::{CycleReport, ScanController};
pub use signal::{classify, Rssi, SignalTier};
pub use viewer::Snapshot;
