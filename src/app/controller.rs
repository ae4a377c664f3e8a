use super::state::StateCell;
use super::types::{ProcessState, ShutdownReason};
use crate::collector::Collector;
use crate::config::ZfsbeatConfig;
use crate::error::Result;
use crate::logging::LogSink;
use crate::signals::{ShutdownLatch, ShutdownListener};
use std::sync::Arc;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub(super) type SharedCollector = Arc<AsyncMutex<Box<dyn Collector>>>;
pub(super) type WorkerHandle = JoinHandle<Result<()>>;

/// Lifecycle controller driving a single collector from startup to exit
pub struct BeatController {
    pub(super) config: ZfsbeatConfig,
    pub(super) sink: Arc<LogSink>,

    // The worker holds the lock while running; an aborted worker releases it
    // so the collector can still be closed
    pub(super) collector: SharedCollector,
    pub(super) worker: Option<WorkerHandle>,

    // Lifecycle management
    pub(super) state: StateCell,
    pub(super) latch: ShutdownLatch,
    pub(super) listener: Option<ShutdownListener>,
    pub(super) cancellation_token: CancellationToken,
}

/// Cloneable handle for requesting a shutdown and watching the process state
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    latch: ShutdownLatch,
    state: watch::Receiver<ProcessState>,
}

impl ShutdownHandle {
    /// Ask the beat to stop. Returns `false` if a shutdown was already requested.
    pub fn request_shutdown(&self) -> bool {
        self.latch.fire(ShutdownReason::Supervisor)
    }

    pub fn state(&self) -> ProcessState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProcessState> {
        self.state.clone()
    }
}

impl BeatController {
    /// Create a controller in the `Starting` state
    pub fn new(config: ZfsbeatConfig, collector: Box<dyn Collector>, sink: Arc<LogSink>) -> Self {
        let (latch, listener) = ShutdownLatch::new();

        Self {
            config,
            sink,
            collector: Arc::new(AsyncMutex::new(collector)),
            worker: None,
            state: StateCell::new(),
            latch,
            listener: Some(listener),
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.beat.name
    }

    pub fn state(&self) -> ProcessState {
        self.state.current()
    }

    pub fn sink(&self) -> Arc<LogSink> {
        Arc::clone(&self.sink)
    }

    /// Handle usable before `start`, e.g. by a supervisor waiting for `Running`
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            latch: self.latch.clone(),
            state: self.state.subscribe(),
        }
    }
}

impl Drop for BeatController {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}
