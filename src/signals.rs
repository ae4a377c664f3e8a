//! Bridge between external termination requests and the controller.
//!
//! Signal listeners and supervisor calls only ever write into a
//! [`ShutdownLatch`]; the controller is the single reader of the matching
//! [`ShutdownListener`].

use crate::app::ShutdownReason;
use crate::error::{Result, ZfsbeatError};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One-shot latch delivering at most one [`ShutdownReason`]
#[derive(Debug, Clone)]
pub struct ShutdownLatch {
    sender: Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>,
}

/// Receiving half of a [`ShutdownLatch`]
#[derive(Debug)]
pub struct ShutdownListener {
    receiver: oneshot::Receiver<ShutdownReason>,
}

impl ShutdownLatch {
    pub fn new() -> (Self, ShutdownListener) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                sender: Arc::new(Mutex::new(Some(sender))),
            },
            ShutdownListener { receiver },
        )
    }

    /// Fire the latch. Returns `false` if it had already fired.
    pub fn fire(&self, reason: ShutdownReason) -> bool {
        match self.sender.lock().take() {
            Some(sender) => {
                debug!("Shutdown requested: {}", reason);
                // A dropped listener means the controller is already gone
                let _ = sender.send(reason);
                true
            }
            None => {
                debug!("Shutdown already requested, ignoring {}", reason);
                false
            }
        }
    }

    pub fn is_fired(&self) -> bool {
        self.sender.lock().is_none()
    }
}

impl ShutdownListener {
    /// Wait for the latch to fire
    pub async fn wait(self) -> Result<ShutdownReason> {
        self.receiver
            .await
            .map_err(|_| ZfsbeatError::system("Shutdown channel closed unexpectedly"))
    }
}

/// Listens for SIGTERM and SIGINT and turns the first one into a shutdown
/// request. Listener tasks are aborted when the bridge is dropped.
#[derive(Debug)]
pub struct SignalBridge {
    tasks: Vec<JoinHandle<()>>,
}

impl SignalBridge {
    /// Register the signal handlers. Must be called from within a Tokio runtime.
    pub fn install(latch: ShutdownLatch) -> Result<Self> {
        let mut tasks = Vec::new();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            for (kind, name) in [
                (SignalKind::terminate(), "SIGTERM"),
                (SignalKind::interrupt(), "SIGINT"),
            ] {
                let mut stream = signal(kind).map_err(|e| {
                    ZfsbeatError::initialization(
                        "signals",
                        format!("failed to register {} handler: {}", name, e),
                    )
                })?;
                let latch = latch.clone();
                tasks.push(tokio::spawn(async move {
                    while stream.recv().await.is_some() {
                        info!("Received {} signal", name);
                        latch.fire(ShutdownReason::Signal(name.to_string()));
                    }
                }));
            }
        }

        #[cfg(not(unix))]
        {
            tasks.push(tokio::spawn(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl+C");
                    latch.fire(ShutdownReason::Signal("CTRL_C".to_string()));
                }
            }));
        }

        debug!("Installed {} signal listener(s)", tasks.len());
        Ok(Self { tasks })
    }
}

impl Drop for SignalBridge {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
