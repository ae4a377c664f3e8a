use super::ProcessState;
use crate::error::{Result, ZfsbeatError};
use tokio::sync::watch;
use tracing::debug;

/// Holder of the controller's [`ProcessState`].
///
/// Only the controller advances it; everyone else gets a receiver.
#[derive(Debug)]
pub(super) struct StateCell {
    tx: watch::Sender<ProcessState>,
}

impl StateCell {
    pub(super) fn new() -> Self {
        let (tx, _rx) = watch::channel(ProcessState::Starting);
        Self { tx }
    }

    pub(super) fn current(&self) -> ProcessState {
        *self.tx.borrow()
    }

    pub(super) fn subscribe(&self) -> watch::Receiver<ProcessState> {
        self.tx.subscribe()
    }

    /// Move to `next`. Fails unless `next` comes strictly after the current state.
    pub(super) fn advance(&self, next: ProcessState) -> Result<ProcessState> {
        // Ok(previous) when applied, Err(current) when rejected
        let mut outcome = Err(next);
        self.tx.send_if_modified(|current| {
            if next > *current {
                outcome = Ok(*current);
                *current = next;
                true
            } else {
                outcome = Err(*current);
                false
            }
        });

        match outcome {
            Ok(previous) => {
                debug!("Process state changed: {} -> {}", previous, next);
                Ok(previous)
            }
            Err(current) => Err(ZfsbeatError::system(format!(
                "invalid state transition: {} -> {}",
                current, next
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_are_monotonic() {
        let cell = StateCell::new();
        assert_eq!(cell.current(), ProcessState::Starting);

        assert_eq!(cell.advance(ProcessState::Running).unwrap(), ProcessState::Starting);
        assert!(cell.advance(ProcessState::Running).is_err());
        assert!(cell.advance(ProcessState::Starting).is_err());

        cell.advance(ProcessState::ShuttingDown).unwrap();
        cell.advance(ProcessState::Stopped).unwrap();
        assert!(cell.advance(ProcessState::ShuttingDown).is_err());
        assert_eq!(cell.current(), ProcessState::Stopped);
    }

    #[test]
    fn test_failed_startup_may_skip_to_stopped() {
        let cell = StateCell::new();
        cell.advance(ProcessState::Stopped).unwrap();
        assert!(cell.advance(ProcessState::Running).is_err());
    }

    #[test]
    fn test_subscribers_observe_changes() {
        let cell = StateCell::new();
        let rx = cell.subscribe();
        cell.advance(ProcessState::Running).unwrap();
        assert_eq!(*rx.borrow(), ProcessState::Running);
    }
}
