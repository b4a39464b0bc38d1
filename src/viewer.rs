//! Read-only view of the device file
//!
//! Each reload reads the file once into an immutable [`Snapshot`] sorted by
//! signal strength, strongest first, devices without a reading last.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::ViewerError;
use crate::registry::DeviceRecord;
use crate::signal::{Rssi, SignalTier};

const ANSI_RESET: &str = "\x1B[0m";

/// Label for devices whose name was never resolved
pub const UNKNOWN_NAME: &str = "Unknown";

/// Sorted, immutable copy of the stored devices
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: Vec<DeviceRecord>,
}

impl Snapshot {
    /// Read the device file
    ///
    /// Unlike the scanner, a missing or corrupt file is reported so the caller
    /// can tell "nothing found yet" apart from "no usable data".
    pub fn load(path: &Path) -> Result<Self, ViewerError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ViewerError::Missing(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        let records: Vec<DeviceRecord> =
            serde_json::from_str(&contents).map_err(|source| ViewerError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;

        log::debug!("Loaded snapshot of {} devices from {}", records.len(), path.display());
        Ok(Self::from_records(records))
    }

    pub fn from_records(mut records: Vec<DeviceRecord>) -> Self {
        records.sort_by(|a, b| {
            b.signal_strength
                .cmp(&a.signal_strength)
                .then_with(|| a.address.cmp(&b.address))
        });
        Self { entries: records }
    }

    pub fn entries(&self) -> &[DeviceRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of devices in each tier, strongest tier first
    pub fn tier_counts(&self) -> Vec<(SignalTier, usize)> {
        [
            SignalTier::Strong,
            SignalTier::Good,
            SignalTier::Moderate,
            SignalTier::Weak,
            SignalTier::Unavailable,
        ]
        .into_iter()
        .map(|tier| {
            let count = self
                .entries
                .iter()
                .filter(|record| record.signal_strength.tier() == tier)
                .count();
            (tier, count)
        })
        .collect()
    }
}

/// Format a single device as one line
pub fn render_entry(record: &DeviceRecord, color: bool) -> String {
    let name = if record.name.trim().is_empty() {
        UNKNOWN_NAME
    } else {
        record.name.as_str()
    };
    let signal = match record.signal_strength {
        Rssi::Dbm(value) => format!("{} dBm", value),
        Rssi::Unavailable => "N/A".to_string(),
    };
    let tier = record.signal_strength.tier();

    let line = format!("{} ({}) - Signal: {} [{}]", name, record.address, signal, tier);
    if color {
        format!("{}{}{}", tier.ansi_code(), line, ANSI_RESET)
    } else {
        line
    }
}

/// Format the whole snapshot
pub fn render(snapshot: &Snapshot, color: bool) -> String {
    if snapshot.is_empty() {
        return "No devices recorded yet.\n".to_string();
    }

    let mut out = format!("Found Bluetooth devices ({}):\n", snapshot.len());
    for record in snapshot.entries() {
        out.push_str(&render_entry(record, color));
        out.push('\n');
    }
    out
}
