//! Scan cycle controller
//!
//! Owns the registry for the lifetime of the process. Each cycle lists the
//! visible devices, queries each one for a signal reading, merges the results
//! and rewrites the device file. Cycles run back to back with a fixed pause
//! and never overlap.

use std::time::Duration;

use crate::bluetooth::{parse_device_listing, parse_rssi, DiscoveryTool};
use crate::error::{AppError, ErrorContext};
use crate::lifecycle_manager::ShutdownSignal;
use crate::logging::log_error_with_recovery;
use crate::registry::{DeviceStore, MergeOutcome, Observation, Registry};
use crate::signal::Rssi;

/// Counts from a single completed cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Devices parsed from the listing
    pub listed: usize,
    /// Listing lines that could not be parsed
    pub skipped: usize,
    /// Devices seen for the first time
    pub discovered: usize,
    /// Known devices whose reading was refreshed
    pub updated: usize,
    /// Info queries that failed and were recorded as unavailable
    pub info_failures: usize,
    /// Devices left untouched because shutdown was requested mid-cycle
    pub abandoned: usize,
}

/// Drives repeated discovery rounds against a [`DiscoveryTool`]
pub struct ScanController<T: DiscoveryTool> {
    tool: T,
    store: DeviceStore,
    registry: Registry,
    interval: Duration,
}

impl<T: DiscoveryTool> ScanController<T> {
    /// Create a controller, seeding the registry from the device file
    pub fn new(tool: T, store: DeviceStore, interval: Duration) -> Self {
        let registry = store.load();
        Self {
            tool,
            store,
            registry,
            interval,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one discovery round and persist the result
    ///
    /// A failed listing aborts the round before anything is merged. A failed
    /// per-device query only marks that device's reading unavailable.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, AppError> {
        self.cycle(None).await
    }

    /// Like [`run_cycle`](Self::run_cycle), but stops querying once shutdown is
    /// requested
    ///
    /// Devices not yet queried, and queries that fail after the request, are
    /// left out of the merge so a stopping process never overwrites a stored
    /// reading with "unavailable". What was gathered is still saved.
    pub async fn run_cycle_until(&mut self, shutdown: &ShutdownSignal) -> Result<CycleReport, AppError> {
        self.cycle(Some(shutdown)).await
    }

    async fn cycle(&mut self, shutdown: Option<&ShutdownSignal>) -> Result<CycleReport, AppError> {
        let stopping = || shutdown.map_or(false, ShutdownSignal::is_triggered);

        let output = self.tool.list_devices().await?;
        let listing = parse_device_listing(&output);

        let mut report = CycleReport {
            listed: listing.devices.len(),
            skipped: listing.skipped,
            ..Default::default()
        };

        for device in listing.devices {
            if stopping() {
                report.abandoned += 1;
                continue;
            }

            let signal_strength = match self.tool.device_info(&device.address).await {
                Ok(info) => parse_rssi(&info),
                Err(e) if stopping() => {
                    log::debug!("Info query for {} failed during shutdown: {}", device.address, e);
                    report.abandoned += 1;
                    continue;
                }
                Err(e) => {
                    log::warn!("Info query for {} failed: {}", device.address, e);
                    report.info_failures += 1;
                    Rssi::Unavailable
                }
            };

            let observation = Observation::new(device.address, device.name, signal_strength);
            match self.registry.merge(observation) {
                MergeOutcome::Discovered => report.discovered += 1,
                MergeOutcome::Updated => report.updated += 1,
            }
        }

        self.store.save(&self.registry)?;
        Ok(report)
    }

    /// Scan until shutdown is requested, then switch discovery off
    ///
    /// Returns the number of cycles that were attempted.
    pub async fn run(&mut self, mut shutdown: ShutdownSignal) -> u64 {
        log::info!(
            "Bluetooth scan started, writing to {} every {:?}. Press Ctrl+C to stop.",
            self.store.path().display(),
            self.interval
        );

        if let Err(e) = self.tool.start_scan().await {
            let context = ErrorContext::new("ScanController", "start_scan");
            log_error_with_recovery(&e, &context, "listing devices the tool already knows");
        }

        let mut cycles = 0u64;
        loop {
            if shutdown.is_triggered() {
                break;
            }

            cycles += 1;
            match self.run_cycle_until(&shutdown).await {
                Ok(report) => log::debug!("Cycle {}: {:?}", cycles, report),
                Err(e) => {
                    let context = ErrorContext::new("ScanController", "run_cycle")
                        .with_metadata("cycle", cycles.to_string());
                    log_error_with_recovery(&e, &context, "retrying on the next cycle");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.triggered() => break,
            }
        }

        self.stop(shutdown.is_triggered()).await;
        cycles
    }

    async fn stop(&self, requested: bool) {
        log::info!("{}", stop_message(requested));
        if let Err(e) = self.tool.stop_scan().await {
            log::debug!("Switching discovery off failed (ignored): {}", e);
        }
        log::info!("Known devices: {}", self.registry.len());
    }
}

fn stop_message(requested: bool) -> &'static str {
    if requested {
        "Scan stopped by user"
    } else {
        "Scan stopped: shutdown trigger dropped"
    }
}
