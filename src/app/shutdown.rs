use super::{BeatController, ProcessState, ShutdownReason};
use crate::collector::Collector;
use crate::error::{Result, ZfsbeatError, EXIT_FAULT, EXIT_OK};
use crate::logging::LogSink;
use tokio::time::timeout;
use tracing::{debug, info, warn};

impl BeatController {
    /// Perform graceful shutdown and return the exit status
    pub(super) async fn shutdown(&mut self, reason: ShutdownReason) -> i32 {
        if let Err(e) = self.state.advance(ProcessState::ShuttingDown) {
            self.sink.error(format!("Cannot shut down: {}", e));
            return EXIT_FAULT;
        }

        info!("Beginning graceful shutdown");

        // Cancel the collector worker
        self.cancellation_token.cancel();

        let mut exit_code = reason.exit_code();

        if let Err(e) = self.stop_worker().await {
            let code = e.exit_code();
            if code == EXIT_OK {
                self.sink.warn(e.to_string());
            } else {
                self.sink.error(e.to_string());
                if exit_code == EXIT_OK {
                    exit_code = code;
                }
            }
        }

        if let Err(e) = self.state.advance(ProcessState::Stopped) {
            self.sink.error(format!("Cannot finish shutdown: {}", e));
            return EXIT_FAULT;
        }

        self.sink.info(format!(
            "{} stopped with exit code {}",
            self.config.beat.name, exit_code
        ));
        exit_code
    }

    /// Wait for the worker to finish, then close the collector.
    ///
    /// The collector is closed on every path, including a worker that
    /// panicked or had to be aborted after the stop timeout.
    async fn stop_worker(&mut self) -> Result<()> {
        let outcome = match self.worker.take() {
            Some(mut worker) => {
                let stop_timeout = self.config.shutdown.stop_timeout();
                match timeout(stop_timeout, &mut worker).await {
                    Ok(Ok(result)) => {
                        if let Err(e) = result {
                            warn!("Collector {} finished with error: {}", self.config.beat.name, e);
                        }
                        Ok(())
                    }
                    Ok(Err(join_error)) => Err(ZfsbeatError::system(format!(
                        "collector worker failed: {}",
                        join_error
                    ))),
                    Err(_) => {
                        worker.abort();
                        // Wait for the aborted task to drop its lock
                        let _ = worker.await;
                        Err(ZfsbeatError::shutdown(format!(
                            "collector did not stop within {:?}",
                            stop_timeout
                        )))
                    }
                }
            }
            None => Ok(()),
        };

        let mut collector = self.collector.lock().await;
        close_collector(&self.sink, collector.as_mut()).await;

        outcome
    }
}

/// Close a collector, logging instead of propagating failures
pub(super) async fn close_collector(sink: &LogSink, collector: &mut dyn Collector) {
    match collector.close().await {
        Ok(()) => debug!("Collector {} closed", collector.name()),
        Err(e) => {
            sink.warn(format!("Error closing collector {}: {}", collector.name(), e));
        }
    }
}
