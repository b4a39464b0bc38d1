//! Device discovery through an external Bluetooth control tool

mod bluetoothctl;
pub mod parser;

pub use bluetoothctl::{BluetoothCtl, DiscoveryTool};
pub use parser::{parse_device_line, parse_device_listing, parse_rssi, DeviceLine, DeviceListing};
pub use crate::error::BluetoothError;
