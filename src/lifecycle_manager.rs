//! Shutdown signalling
//!
//! The scan loop is never cancelled mid-await. Ctrl+C flips a shared flag that
//! the loop checks before each cycle, between device queries and while it
//! sleeps between cycles.

use std::sync::Arc;

use tokio::sync::watch;

/// Sending half, held by whatever decides the program should stop
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        // send_replace never fails, even with no receivers left
        self.sender.send_replace(true);
    }
}

/// Receiving half, checked by the scan loop
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

/// Create a linked trigger and signal
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (
        ShutdownTrigger {
            sender: Arc::new(sender),
        },
        ShutdownSignal { receiver },
    )
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once shutdown has been requested
    ///
    /// Also resolves if every trigger was dropped, since nothing could stop the
    /// loop after that.
    pub async fn triggered(&mut self) {
        if self.receiver.wait_for(|stop| *stop).await.is_err() {
            log::debug!("Shutdown trigger dropped");
        }
    }
}

/// Trigger shutdown on Ctrl+C
pub fn install_ctrlc_handler(trigger: ShutdownTrigger) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        log::info!("Received Ctrl+C, stopping after the current query");
        trigger.trigger();
    })
}
