use super::shutdown::close_collector;
use super::{BeatController, ProcessState, ShutdownHandle, ShutdownReason};
use crate::error::{Result, ZfsbeatError};
use std::sync::Arc;
use tracing::{error, info};

impl BeatController {
    /// Validate configuration, initialize the collector and enter `Running`.
    ///
    /// The readiness line `"<name> is running"` is written exactly when the
    /// state moves from `Starting` to `Running`. On failure the controller
    /// ends up `Stopped` and no readiness line is written.
    pub async fn start(&mut self) -> Result<ShutdownHandle> {
        let current = self.state.current();
        if current != ProcessState::Starting {
            return Err(ZfsbeatError::system(format!(
                "cannot start beat while {}",
                current
            )));
        }

        let name = self.config.beat.name.clone();
        self.sink
            .info(format!("Starting {} v{}", name, env!("CARGO_PKG_VERSION")));

        if let Err(e) = self.config.validate() {
            self.sink.error(format!("Invalid configuration: {}", e));
            self.state.advance(ProcessState::Stopped)?;
            return Err(e.into());
        }

        {
            let mut collector = self.collector.lock().await;

            info!("Initializing collector {}", collector.name());
            if let Err(e) = collector.initialize().await {
                self.sink.error(format!(
                    "Failed to initialize collector {}: {}",
                    collector.name(),
                    e
                ));
                close_collector(&self.sink, collector.as_mut()).await;
                self.state.advance(ProcessState::Stopped)?;
                return Err(match e {
                    ZfsbeatError::Initialization { .. } => e,
                    other => ZfsbeatError::initialization("collector", other.to_string()),
                });
            }
        }

        self.spawn_worker();

        self.state.advance(ProcessState::Running)?;
        self.sink
            .info(format!("{} is running! Hit CTRL-C to stop it.", name));

        Ok(self.shutdown_handle())
    }

    /// Run the collector in a background task until cancelled
    fn spawn_worker(&mut self) {
        let collector = Arc::clone(&self.collector);
        let token = self.cancellation_token.clone();
        let latch = self.latch.clone();

        self.worker = Some(tokio::spawn(async move {
            let mut collector = collector.lock().await;
            let result = collector.run(token.clone()).await;

            // Stopping on its own is a shutdown request too
            if !token.is_cancelled() {
                let reason = match &result {
                    Ok(()) => ShutdownReason::CollectorExited,
                    Err(e) => {
                        error!("Collector {} failed: {}", collector.name(), e);
                        ShutdownReason::Error(e.to_string())
                    }
                };
                latch.fire(reason);
            }

            result
        }));
    }
}
