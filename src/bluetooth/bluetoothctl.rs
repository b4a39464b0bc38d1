//! Driver for the `bluetoothctl` command line tool
//!
//! Background discovery is a long-running `scan on` child process. Listing and
//! per-device queries are short invocations bounded by a timeout.
//!
//! On unix every child gets its own process group so a terminal Ctrl+C reaches
//! only this process; shutdown then happens between cycles.

use std::process::Stdio;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::time::timeout;

use crate::config::ScannerConfig;
use crate::error::BluetoothError;

/// How long `Drop` waits for the fallback `scan off` before giving up on it
const DROP_SCAN_OFF_TIMEOUT: Duration = Duration::from_secs(2);

/// Poll interval while waiting for the fallback `scan off`
const DROP_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Operations the scan loop needs from a discovery tool
#[async_trait]
pub trait DiscoveryTool: Send + Sync {
    /// Switch background discovery on
    async fn start_scan(&self) -> Result<(), BluetoothError>;

    /// Switch background discovery off
    async fn stop_scan(&self) -> Result<(), BluetoothError>;

    /// Raw listing of currently known devices
    async fn list_devices(&self) -> Result<String, BluetoothError>;

    /// Raw details for a single device
    async fn device_info(&self, address: &str) -> Result<String, BluetoothError>;
}

/// `bluetoothctl` invoked as a subprocess
pub struct BluetoothCtl {
    program: String,
    timeout: Duration,
    scan_process: Mutex<Option<Child>>,
}

impl BluetoothCtl {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            scan_process: Mutex::new(None),
        }
    }

    pub fn from_config(config: &ScannerConfig) -> Self {
        Self::new(config.command.clone(), config.command_timeout)
    }

    /// Command for the tool, detached from the terminal's process group
    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    fn describe(&self, args: &[&str]) -> String {
        std::iter::once(self.program.as_str())
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the tool to completion and return its stdout
    async fn run(&self, args: &[&str]) -> Result<String, BluetoothError> {
        let command = self.describe(args);
        log::debug!("Running '{}'", command);

        let mut cmd = self.command(args);
        let output = match timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                return Err(BluetoothError::Timeout {
                    command,
                    timeout: self.timeout,
                })
            }
            Ok(Err(source)) => return Err(BluetoothError::Spawn { command, source }),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            return Err(BluetoothError::NonZeroExit {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn take_scan_process(&self) -> Option<Child> {
        match self.scan_process.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

#[async_trait]
impl DiscoveryTool for BluetoothCtl {
    async fn start_scan(&self) -> Result<(), BluetoothError> {
        let command = self.describe(&["scan", "on"]);

        let child = self
            .command(&["scan", "on"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| BluetoothError::Spawn {
                command: command.clone(),
                source,
            })?;

        log::info!("Background discovery started ('{}', pid {:?})", command, child.id());

        let previous = match self.scan_process.lock() {
            Ok(mut slot) => slot.replace(child),
            Err(poisoned) => poisoned.into_inner().replace(child),
        };
        if let Some(mut previous) = previous {
            let _ = previous.start_kill();
        }

        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), BluetoothError> {
        if let Some(mut child) = self.take_scan_process() {
            if let Err(e) = child.kill().await {
                log::debug!("Background discovery process already gone: {}", e);
            }
        }

        self.run(&["scan", "off"]).await.map(|_| ())
    }

    async fn list_devices(&self) -> Result<String, BluetoothError> {
        self.run(&["devices"]).await
    }

    async fn device_info(&self, address: &str) -> Result<String, BluetoothError> {
        self.run(&["info", address]).await
    }
}

impl Drop for BluetoothCtl {
    // Covers exits that never reached `stop_scan`, e.g. an early return or panic.
    fn drop(&mut self) {
        let child = match self.scan_process.get_mut() {
            Ok(slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        let Some(mut child) = child else {
            return;
        };
        let _ = child.start_kill();

        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(["scan", "off"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut cmd, 0);

        let mut scan_off = match cmd.spawn() {
            Ok(scan_off) => scan_off,
            Err(e) => {
                log::debug!("Scan off during drop could not start: {}", e);
                return;
            }
        };

        let deadline = Instant::now() + DROP_SCAN_OFF_TIMEOUT;
        loop {
            match scan_off.try_wait() {
                Ok(Some(status)) => {
                    log::debug!("Scan off during drop: {}", status);
                    return;
                }
                Ok(None) if Instant::now() < deadline => std::thread::sleep(DROP_POLL_INTERVAL),
                Ok(None) => {
                    log::debug!("Scan off during drop timed out after {:?}", DROP_SCAN_OFF_TIMEOUT);
                    let _ = scan_off.kill();
                    let _ = scan_off.wait();
                    return;
                }
                Err(e) => {
                    log::debug!("Scan off during drop: {}", e);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_command() {
        let ctl = BluetoothCtl::new("bluetoothctl", Duration::from_secs(5));
        assert_eq!(ctl.describe(&["info", "AA:BB:CC:DD:EE:FF"]), "bluetoothctl info AA:BB:CC:DD:EE:FF");
    }

    #[tokio::test]
    async fn test_missing_program_reports_spawn_error() {
        let ctl = BluetoothCtl::new("definitely-not-a-real-bluetooth-tool", Duration::from_secs(5));

        let err = ctl.list_devices().await.unwrap_err();
        assert!(matches!(err, BluetoothError::Spawn { .. }));

        let err = ctl.start_scan().await.unwrap_err();
        assert!(matches!(err, BluetoothError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_reported() {
        let ctl = BluetoothCtl::new("false", Duration::from_secs(5));

        let err = ctl.list_devices().await.unwrap_err();
        assert!(matches!(err, BluetoothError::NonZeroExit { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdout_is_returned() {
        // `echo` prints its arguments back
        let ctl = BluetoothCtl::new("echo", Duration::from_secs(5));

        let output = ctl.device_info("AA:BB:CC:DD:EE:FF").await.unwrap();
        assert_eq!(output.trim(), "info AA:BB:CC:DD:EE:FF");
    }

    /// Write an executable shell script standing in for bluetoothctl
    #[cfg(unix)]
    fn fake_tool(dir: &std::path::Path, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-bluetoothctl");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_drop_switches_discovery_off() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("calls.log");
        let tool = fake_tool(
            dir.path(),
            &format!(
                "echo \"$*\" >> '{}'\n\
                 if [ \"$1\" = scan ] && [ \"$2\" = on ]; then exec sleep 30; fi",
                log_path.display()
            ),
        );

        let ctl = BluetoothCtl::new(tool.to_string_lossy(), Duration::from_secs(5));
        ctl.start_scan().await.unwrap();

        // Let the background child record itself before it is killed
        for _ in 0..100 {
            if std::fs::read_to_string(&log_path).map_or(false, |calls| calls.contains("scan on")) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        drop(ctl);

        let calls = std::fs::read_to_string(&log_path).unwrap();
        assert!(calls.lines().any(|line| line == "scan on"), "calls: {:?}", calls);
        assert!(calls.lines().any(|line| line == "scan off"), "calls: {:?}", calls);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_drop_without_scan_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("calls.log");
        let tool = fake_tool(dir.path(), &format!("echo \"$*\" >> '{}'", log_path.display()));

        drop(BluetoothCtl::new(tool.to_string_lossy(), Duration::from_secs(5)));

        assert!(!log_path.exists());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_queries_run_in_their_own_process_group() {
        let dir = tempfile::tempdir().unwrap();
        // Prints the shell's pid and process group id
        let tool = fake_tool(dir.path(), "cut -d' ' -f1,5 /proc/$$/stat");

        let ctl = BluetoothCtl::new(tool.to_string_lossy(), Duration::from_secs(5));
        let output = ctl.list_devices().await.unwrap();

        let ids: Vec<&str> = output.split_whitespace().collect();
        assert_eq!(ids.len(), 2, "output: {:?}", output);
        assert_eq!(ids[0], ids[1]);
        assert_ne!(ids[1], std::process::id().to_string());
    }
}
