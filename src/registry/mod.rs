//! Known-device registry
//!
//! Every device ever seen during this process lives here, keyed by hardware
//! address. Records are never removed. A later sighting only refreshes the
//! signal reading; the first name observed for an address is kept.

mod store;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::signal::Rssi;

pub use store::DeviceStore;

/// One device as written to the device file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    #[serde(rename = "mac")]
    pub address: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "rssi", default)]
    pub signal_strength: Rssi,
}

impl DeviceRecord {
    pub fn new(address: impl Into<String>, name: impl Into<String>, signal_strength: Rssi) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            signal_strength,
        }
    }
}

/// A single sighting reported by the discovery tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub address: String,
    pub name: String,
    pub signal_strength: Rssi,
}

impl Observation {
    pub fn new(address: impl Into<String>, name: impl Into<String>, signal_strength: Rssi) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            signal_strength,
        }
    }
}

/// What a merge did to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// First sighting; a record was inserted
    Discovered,
    /// Known device; its signal reading was replaced
    Updated,
}

/// In-memory set of known devices
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    devices: BTreeMap<String, DeviceRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from stored records; the first record for an address wins
    pub fn from_records(records: impl IntoIterator<Item = DeviceRecord>) -> Self {
        let mut registry = Self::new();
        for record in records {
            if registry.devices.contains_key(&record.address) {
                log::warn!("Ignoring duplicate stored record for {}", record.address);
                continue;
            }
            registry.devices.insert(record.address.clone(), record);
        }
        registry
    }

    /// Fold one sighting into the registry
    pub fn merge(&mut self, observation: Observation) -> MergeOutcome {
        if let Some(existing) = self.devices.get_mut(&observation.address) {
            log::debug!(
                "Updated {} ({}): RSSI {} -> {}",
                existing.address,
                existing.name,
                existing.signal_strength,
                observation.signal_strength
            );
            existing.signal_strength = observation.signal_strength;
            return MergeOutcome::Updated;
        }

        log::info!(
            "New device discovered: {} - {} (RSSI: {})",
            observation.address,
            observation.name,
            observation.signal_strength
        );
        let record = DeviceRecord {
            address: observation.address.clone(),
            name: observation.name,
            signal_strength: observation.signal_strength,
        };
        self.devices.insert(observation.address, record);
        MergeOutcome::Discovered
    }

    pub fn get(&self, address: &str) -> Option<&DeviceRecord> {
        self.devices.get(address)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Records in address order
    pub fn records(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.devices.values()
    }

    pub fn to_records(&self) -> Vec<DeviceRecord> {
        self.devices.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ADDRESS: &str = "AA:BB:CC:DD:EE:FF";

    #[test]
    fn test_merge_inserts_new_device() {
        let mut registry = Registry::new();

        let outcome = registry.merge(Observation::new(ADDRESS, "Speaker", Rssi::Dbm(-48)));

        assert_eq!(outcome, MergeOutcome::Discovered);
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get(ADDRESS),
            Some(&DeviceRecord::new(ADDRESS, "Speaker", Rssi::Dbm(-48)))
        );
    }

    #[test]
    fn test_merge_same_observation_twice_is_idempotent() {
        let observation = Observation::new(ADDRESS, "Speaker", Rssi::Dbm(-48));

        let mut once = Registry::new();
        once.merge(observation.clone());

        let mut twice = Registry::new();
        twice.merge(observation.clone());
        let outcome = twice.merge(observation);

        assert_eq!(outcome, MergeOutcome::Updated);
        assert_eq!(once, twice);
        assert_eq!(twice.len(), 1);
    }

    #[test]
    fn test_merge_keeps_first_name_and_updates_signal() {
        let mut registry = Registry::from_records(vec![DeviceRecord::new(ADDRESS, "Foo", Rssi::Dbm(-40))]);

        registry.merge(Observation::new(ADDRESS, "Bar", Rssi::Dbm(-60)));

        assert_eq!(
            registry.get(ADDRESS),
            Some(&DeviceRecord::new(ADDRESS, "Foo", Rssi::Dbm(-60)))
        );
    }

    #[test]
    fn test_merge_can_clear_signal_reading() {
        let mut registry = Registry::new();
        registry.merge(Observation::new(ADDRESS, "Foo", Rssi::Dbm(-40)));
        registry.merge(Observation::new(ADDRESS, "Foo", Rssi::Unavailable));

        assert_eq!(registry.get(ADDRESS).map(|r| r.signal_strength), Some(Rssi::Unavailable));
    }

    #[test]
    fn test_from_records_drops_duplicates() {
        let registry = Registry::from_records(vec![
            DeviceRecord::new(ADDRESS, "First", Rssi::Dbm(-40)),
            DeviceRecord::new(ADDRESS, "Second", Rssi::Dbm(-70)),
        ]);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(ADDRESS).map(|r| r.name.as_str()), Some("First"));
    }

    #[test]
    fn test_record_json_field_names() {
        let record = DeviceRecord::new(ADDRESS, "Speaker", Rssi::Dbm(-48));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "mac": ADDRESS, "name": "Speaker", "rssi": "-48" })
        );
    }
}
