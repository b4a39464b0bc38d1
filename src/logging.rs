//! Structured logging for the Bluetooth mapper
//!
//! Timestamped, level-coloured output on stderr with an optional plain-text
//! copy in a log file. Debug records are only emitted for the categories that
//! were switched on, so a noisy `bluetooth` category does not drown out the
//! registry messages and vice versa.

use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record};
use std::fmt::Debug;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Mutex, Once, RwLock};

use crate::config::LogLevel;
use crate::error::ErrorContext;

/// Timestamp format for log entries
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Global initialization guard
static INIT_LOGGER: Once = Once::new();

/// Debug flag categories for selective logging
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugFlags {
    pub bluetooth: bool, // Discovery tool invocations and raw output
    pub registry: bool,  // Merges and device file writes
    pub config: bool,    // Configuration loading and validation
    pub system: bool,    // Lifecycle and shutdown
    pub all: bool,
}

impl DebugFlags {
    /// Build flags from category names, ignoring unknown ones
    pub fn from_categories<S: AsRef<str>>(categories: &[S]) -> Self {
        let mut flags = Self::default();
        for category in categories {
            match category.as_ref().trim().to_ascii_lowercase().as_str() {
                "bluetooth" => flags.bluetooth = true,
                "registry" => flags.registry = true,
                "config" => flags.config = true,
                "system" => flags.system = true,
                "all" => flags.all = true,
                other => log::warn!("Unknown debug category '{}'", other),
            }
        }
        flags
    }
}

/// Global debug flags storage
static DEBUG_FLAGS: RwLock<DebugFlags> = RwLock::new(DebugFlags {
    bluetooth: false,
    registry: false,
    config: false,
    system: false,
    all: false,
});

/// Logger writing to stderr and optionally a file
pub struct MapperLogger {
    file: Option<Mutex<File>>,
    level: LevelFilter,
    console_output: bool,
}

impl log::Log for MapperLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        if metadata.level() > self.level {
            return false;
        }

        if metadata.level() == Level::Debug {
            return should_log_debug(metadata.target());
        }

        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let timestamp = Local::now().format(TIMESTAMP_FORMAT);
        let module = record.module_path().unwrap_or("<unknown>");

        if self.console_output {
            let level_str = match record.level() {
                Level::Error => "\x1B[31mERROR\x1B[0m",
                Level::Warn => "\x1B[33mWARN \x1B[0m",
                Level::Info => "\x1B[32mINFO \x1B[0m",
                Level::Debug => "\x1B[36mDEBUG\x1B[0m",
                Level::Trace => "\x1B[90mTRACE\x1B[0m",
            };
            let entry = format!("[{}] {} [{}] {}\n", timestamp, level_str, module, record.args());
            let _ = io::stderr().write_all(entry.as_bytes());
        }

        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let entry = format!(
                    "[{}] {:<5} [{}] [{}:{}] {}\n",
                    timestamp,
                    record.level(),
                    module,
                    record.file().unwrap_or("<unknown>"),
                    record.line().unwrap_or(0),
                    record.args()
                );
                let _ = file.write_all(entry.as_bytes());
                let _ = file.flush();
            }
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
    }
}

fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Error => LevelFilter::Error,
        LogLevel::Warn => LevelFilter::Warn,
        LogLevel::Info => LevelFilter::Info,
        LogLevel::Debug => LevelFilter::Debug,
        LogLevel::Trace => LevelFilter::Trace,
    }
}

/// Configure logging with the specified level and optionally a log file
///
/// Only the first call installs a logger; later calls are no-ops returning `Ok`.
pub fn configure_logging(
    level: LogLevel,
    log_file: Option<PathBuf>,
    console_output: bool,
) -> Result<(), String> {
    let mut result = Ok(());

    INIT_LOGGER.call_once(|| {
        let level_filter = level_filter(level);

        let file = match log_file.as_ref() {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        if let Err(e) = std::fs::create_dir_all(parent) {
                            result = Err(format!("Failed to create log directory: {}", e));
                            return;
                        }
                    }
                }

                match OpenOptions::new().create(true).append(true).open(path) {
                    Ok(file) => Some(Mutex::new(file)),
                    Err(e) => {
                        result = Err(format!("Failed to open log file: {}", e));
                        return;
                    }
                }
            }
            None => None,
        };

        let logger = Box::new(MapperLogger {
            file,
            level: level_filter,
            console_output,
        });

        if let Err(e) = log::set_boxed_logger(logger) {
            result = Err(format!("Failed to set logger: {}", e));
            return;
        }

        log::set_max_level(level_filter);

        log::info!("Logging initialized at level: {}", level);
        if let Some(path) = log_file {
            log::info!("Log file: {}", path.display());
        }
    });

    result
}

/// Set global debug flags for selective logging
pub fn set_debug_flags(flags: DebugFlags) {
    if let Ok(mut debug_flags) = DEBUG_FLAGS.write() {
        *debug_flags = flags;
    }
}

/// Check if a debug record from `module_path` should be emitted
pub fn should_log_debug(module_path: &str) -> bool {
    let Ok(flags) = DEBUG_FLAGS.read() else {
        return false;
    };

    if flags.all {
        return true;
    }

    if module_path.contains("::bluetooth") {
        return flags.bluetooth;
    }
    if module_path.contains("::registry") || module_path.contains("scan_controller") {
        return flags.registry;
    }
    if module_path.contains("::config") {
        return flags.config;
    }
    if module_path.contains("lifecycle") || module_path.contains("viewer") {
        return flags.system;
    }

    false
}

/// Log an error with context
pub fn log_error<E: Debug>(error: &E, context: &ErrorContext) {
    let mut pairs = context
        .metadata
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>();
    pairs.sort();

    let metadata = if pairs.is_empty() {
        String::new()
    } else {
        format!(" | {}", pairs.join(", "))
    };

    log::error!(
        "[{}::{}] Error: {:?}{}",
        context.component,
        context.operation,
        error,
        metadata
    );

    if let Some(msg) = &context.user_message {
        log::error!("[{}::{}] {}", context.component, context.operation, msg);
    }
}

/// Log an error along with what is being done about it
pub fn log_error_with_recovery<E: Debug>(error: &E, context: &ErrorContext, recovery: &str) {
    log_error(error, context);

    log::info!(
        "[{}::{}] Recovery action: {}",
        context.component,
        context.operation,
        recovery
    );
}
