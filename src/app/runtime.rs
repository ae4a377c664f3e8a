use super::{BeatController, ProcessState, ShutdownReason};
use crate::error::EXIT_FAULT;
use crate::signals::SignalBridge;
use tracing::info;

impl BeatController {
    /// Run the beat with signal handling until it is told to stop.
    ///
    /// Signal handlers are registered before startup, so a termination
    /// request that arrives during initialization is honored as soon as the
    /// beat is running.
    pub async fn run(&mut self) -> i32 {
        let bridge = match SignalBridge::install(self.latch.clone()) {
            Ok(bridge) => bridge,
            Err(e) => {
                self.sink.error(format!("Failed to set up signal handling: {}", e));
                if let Err(e) = self.state.advance(ProcessState::Stopped) {
                    self.sink.error(format!("Cannot stop beat: {}", e));
                }
                return e.exit_code();
            }
        };

        let exit_code = match self.start().await {
            Ok(_) => self.await_shutdown().await,
            Err(e) => {
                info!("{} failed to start: {}", self.config.beat.name, e);
                e.exit_code()
            }
        };

        drop(bridge);
        exit_code
    }

    /// Suspend until a shutdown request arrives, then shut down gracefully
    pub async fn await_shutdown(&mut self) -> i32 {
        let current = self.state.current();
        if current != ProcessState::Running {
            self.sink
                .error(format!("Cannot wait for shutdown while {}", current));
            return EXIT_FAULT;
        }

        let Some(listener) = self.listener.take() else {
            self.sink.error("Shutdown listener already taken");
            return EXIT_FAULT;
        };

        let reason = match listener.wait().await {
            Ok(reason) => reason,
            Err(e) => ShutdownReason::Error(e.to_string()),
        };

        self.sink.info(format!("Shutdown initiated: {}", reason));

        self.shutdown(reason).await
    }
}
