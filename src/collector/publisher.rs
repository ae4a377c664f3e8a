use super::BeatEvent;
use crate::error::{Result, ZfsbeatError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info};

/// Output side of the beat. The transport behind it is up to the implementation.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn connect(&self) -> Result<()>;

    async fn publish(&self, event: &BeatEvent) -> Result<()>;

    /// Must be idempotent
    async fn close(&self) -> Result<()>;
}

/// Publisher that writes events as JSON into the log stream
#[derive(Debug, Default)]
pub struct LogPublisher {
    connected: AtomicBool,
    published: AtomicU64,
}

impl LogPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Publisher for LogPublisher {
    async fn connect(&self) -> Result<()> {
        if !self.connected.swap(true, Ordering::SeqCst) {
            debug!("Log publisher connected");
        }
        Ok(())
    }

    async fn publish(&self, event: &BeatEvent) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ZfsbeatError::publish("log publisher is not connected"));
        }

        let payload = serde_json::to_string(event)?;
        debug!(target: "zfsbeat::publisher", counter = event.counter, "{}", payload);
        self.published.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!("Log publisher closed after {} event(s)", self.published());
        }
        Ok(())
    }
}
