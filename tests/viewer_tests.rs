//! Tests for the read-only device viewer

use std::fs;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use bluetooth_mapper::error::ViewerError;
use bluetooth_mapper::registry::{DeviceRecord, DeviceStore, Observation, Registry};
use bluetooth_mapper::signal::{Rssi, SignalTier};
use bluetooth_mapper::viewer::{render, Snapshot};

fn record(address: &str, name: &str, rssi: Rssi) -> DeviceRecord {
    DeviceRecord::new(address, name, rssi)
}

#[test]
fn test_snapshot_sorts_strongest_first_unavailable_last() {
    let snapshot = Snapshot::from_records(vec![
        record("00:00:00:00:00:01", "Weak", Rssi::Dbm(-90)),
        record("00:00:00:00:00:02", "Unknown signal", Rssi::Unavailable),
        record("00:00:00:00:00:03", "Strong", Rssi::Dbm(-35)),
        record("00:00:00:00:00:04", "Middle", Rssi::Dbm(-65)),
    ]);

    let names: Vec<&str> = snapshot.entries().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Strong", "Middle", "Weak", "Unknown signal"]);
}

#[test]
fn test_snapshot_breaks_ties_by_address() {
    let snapshot = Snapshot::from_records(vec![
        record("BB:00:00:00:00:00", "B", Rssi::Dbm(-50)),
        record("AA:00:00:00:00:00", "A", Rssi::Dbm(-50)),
    ]);

    assert_eq!(snapshot.entries()[0].name, "A");
}

#[test]
fn test_snapshot_reads_scanner_output() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("bluetooth_devices.json");

    let mut registry = Registry::new();
    registry.merge(Observation::new("AA:BB:CC:DD:EE:01", "Headphones", Rssi::Dbm(-44)));
    registry.merge(Observation::new("AA:BB:CC:DD:EE:02", "Car Kit", Rssi::Dbm(-72)));
    DeviceStore::new(&path).save(&registry).unwrap();

    let snapshot = Snapshot::load(&path).unwrap();

    assert_eq!(
        render(&snapshot, false),
        "Found Bluetooth devices (2):\n\
         Headphones (AA:BB:CC:DD:EE:01) - Signal: -44 dBm [strong]\n\
         Car Kit (AA:BB:CC:DD:EE:02) - Signal: -72 dBm [weak]\n"
    );
}

#[test]
fn test_snapshot_reports_missing_and_corrupt_files() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("bluetooth_devices.json");

    assert!(matches!(Snapshot::load(&path), Err(ViewerError::Missing(_))));

    fs::write(&path, "not json").unwrap();
    assert!(matches!(Snapshot::load(&path), Err(ViewerError::Corrupt { .. })));
}

#[test]
fn test_reload_sees_new_data() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("bluetooth_devices.json");
    let store = DeviceStore::new(&path);

    let mut registry = Registry::new();
    registry.merge(Observation::new("AA:BB:CC:DD:EE:01", "Headphones", Rssi::Dbm(-44)));
    store.save(&registry).unwrap();
    let first = Snapshot::load(&path).unwrap();

    registry.merge(Observation::new("AA:BB:CC:DD:EE:02", "Watch", Rssi::Dbm(-30)));
    store.save(&registry).unwrap();
    let second = Snapshot::load(&path).unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 2);
    assert_eq!(second.entries()[0].name, "Watch");
}

#[test]
fn test_tier_counts() {
    let snapshot = Snapshot::from_records(vec![
        record("00:00:00:00:00:01", "a", Rssi::Dbm(-40)),
        record("00:00:00:00:00:02", "b", Rssi::Dbm(-45)),
        record("00:00:00:00:00:03", "c", Rssi::Dbm(-68)),
        record("00:00:00:00:00:04", "d", Rssi::Unavailable),
    ]);

    assert_eq!(
        snapshot.tier_counts(),
        vec![
            (SignalTier::Strong, 2),
            (SignalTier::Good, 0),
            (SignalTier::Moderate, 1),
            (SignalTier::Weak, 0),
            (SignalTier::Unavailable, 1),
        ]
    );
}
