use crate::error::{EXIT_FAULT, EXIT_OK};
use std::fmt;

/// Process lifecycle states, in the only order they can be entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProcessState {
    Starting,
    Running,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessState::Starting => "starting",
            ProcessState::Running => "running",
            ProcessState::ShuttingDown => "shutting down",
            ProcessState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Why the beat is shutting down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Termination signal from the host
    Signal(String),
    /// Stop call through a [`ShutdownHandle`](super::ShutdownHandle)
    Supervisor,
    /// The collector finished on its own
    CollectorExited,
    /// The collector failed while running
    Error(String),
}

impl ShutdownReason {
    /// Exit status of a shutdown that completes without further faults
    pub fn exit_code(&self) -> i32 {
        match self {
            ShutdownReason::Error(_) => EXIT_FAULT,
            _ => EXIT_OK,
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(name) => write!(f, "signal {}", name),
            ShutdownReason::Supervisor => write!(f, "supervisor request"),
            ShutdownReason::CollectorExited => write!(f, "collector exited"),
            ShutdownReason::Error(message) => write!(f, "error: {}", message),
        }
    }
}
