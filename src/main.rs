use std::io::IsTerminal;

use anyhow::Context;

use bluetooth_mapper::config::{default_config_path, AppConfig};
use bluetooth_mapper::logging::{configure_logging, set_debug_flags, DebugFlags};
use bluetooth_mapper::viewer::{self, Snapshot};
use bluetooth_mapper::{install_ctrlc_handler, shutdown_channel, BluetoothCtl, DeviceStore, ScanController};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    human_panic::setup_panic!();

    let args: Vec<String> = std::env::args().collect();

    let config_path = default_config_path();
    let config = AppConfig::load_from_path(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    configure_logging(config.system.log_level, config.system.log_file.clone(), true)
        .map_err(anyhow::Error::msg)?;
    set_debug_flags(DebugFlags::from_categories(&config.system.debug_categories));

    match args.get(1).map(String::as_str) {
        None | Some("scan") => run_scanner(config).await,
        Some("list") => {
            run_viewer(&config);
            Ok(())
        }
        Some("help") | Some("--help") | Some("-h") => {
            print_usage();
            Ok(())
        }
        Some(other) => {
            eprintln!("Unknown command '{}'", other);
            print_usage();
            Ok(())
        }
    }
}

async fn run_scanner(config: AppConfig) -> anyhow::Result<()> {
    let (trigger, shutdown) = shutdown_channel();
    install_ctrlc_handler(trigger).context("Failed to set Ctrl+C handler")?;

    let tool = BluetoothCtl::from_config(&config.scanner);
    let store = DeviceStore::new(config.storage.devices_path.clone());
    let mut controller = ScanController::new(tool, store, config.scanner.scan_interval);

    let cycles = controller.run(shutdown).await;
    log::info!("Exited after {} cycles", cycles);
    Ok(())
}

fn run_viewer(config: &AppConfig) {
    let color = std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();

    match Snapshot::load(&config.storage.devices_path) {
        Ok(snapshot) => print!("{}", viewer::render(&snapshot, color)),
        Err(e) => eprintln!("No valid data found: {}", e),
    }
}

fn print_usage() {
    println!("Usage:");
    println!("  bluetooth-mapper [scan]   - Scan continuously and update the device file (Ctrl+C to stop)");
    println!("  bluetooth-mapper list     - Show recorded devices, strongest signal first");
    println!("  bluetooth-mapper help     - Show this message");
    println!();
    println!("Configuration: {}", default_config_path().display());
}
