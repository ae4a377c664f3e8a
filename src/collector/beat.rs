use super::{BeatEvent, BeatInfo, Collector, Publisher};
use crate::config::{BeatConfig, Source};
use crate::error::{Result, ZfsbeatError};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Periodic collector that publishes one event per period
pub struct BeatCollector {
    info: BeatInfo,
    pattern: String,
    period: Duration,
    sources: Vec<Source>,
    publisher: Arc<dyn Publisher>,
    inputs: Vec<PathBuf>,
    counter: u64,
    failed_publishes: u64,
    connected: bool,
}

impl BeatCollector {
    pub fn new(config: &BeatConfig, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            info: BeatInfo::new(config.name.clone()),
            pattern: config.path.clone(),
            period: config.period(),
            sources: config.enabled_sources(),
            publisher,
            inputs: Vec::new(),
            counter: 1,
            failed_publishes: 0,
            connected: false,
        }
    }

    /// Inputs matched by the path pattern during initialization
    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    /// Number of events published so far
    pub fn events_sent(&self) -> u64 {
        self.counter - 1
    }

    pub fn failed_publishes(&self) -> u64 {
        self.failed_publishes
    }
}

/// Expand a glob pattern into the paths that currently match it.
///
/// Entries that cannot be read are skipped; an empty result is not an error.
pub fn resolve_inputs(pattern: &str) -> Result<Vec<PathBuf>> {
    let entries = glob::glob(pattern).map_err(|e| {
        ZfsbeatError::initialization("collector", format!("invalid path pattern '{}': {}", pattern, e))
    })?;

    let mut inputs = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => inputs.push(path),
            Err(e) => warn!("Skipping unreadable input {}: {}", e.path().display(), e),
        }
    }
    Ok(inputs)
}

#[async_trait]
impl Collector for BeatCollector {
    fn name(&self) -> &str {
        &self.info.name
    }

    async fn initialize(&mut self) -> Result<()> {
        self.publisher.connect().await.map_err(|e| {
            ZfsbeatError::initialization("publisher", format!("failed to connect: {}", e))
        })?;
        self.connected = true;

        self.inputs = resolve_inputs(&self.pattern)?;
        info!(
            "Monitoring {} input(s) matching {}",
            self.inputs.len(),
            self.pattern
        );
        debug!(
            "Collector {} ({}) sources: {:?}, period: {:?}",
            self.info.name, self.info.ephemeral_id, self.sources, self.period
        );
        Ok(())
    }

    async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; events start one period in
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Collector {} cancelled", self.info.name);
                    break;
                }
                _ = ticker.tick() => {}
            }

            let event = BeatEvent::new(&self.info, self.counter, &self.sources);
            let published = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(
                        "Collector {} cancelled while publishing event {}",
                        self.info.name, event.counter
                    );
                    break;
                }
                result = self.publisher.publish(&event) => result,
            };

            match published {
                Ok(()) => {
                    debug!("Event sent");
                    self.counter += 1;
                }
                Err(e) => {
                    self.failed_publishes += 1;
                    warn!("Failed to publish event {}: {}", event.counter, e);
                }
            }
        }

        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.connected {
            return Ok(());
        }
        self.connected = false;
        self.publisher
            .close()
            .await
            .map_err(|e| ZfsbeatError::shutdown(format!("failed to close publisher: {}", e)))
    }
}
