use crate::config::Source;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of the running beat, stamped on every event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatInfo {
    pub name: String,
    pub version: String,
    /// Changes on every process start
    pub ephemeral_id: Uuid,
}

impl BeatInfo {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ephemeral_id: Uuid::new_v4(),
        }
    }
}

/// Payload handed to the publisher once per collection period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatEvent {
    #[serde(rename = "@timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub counter: u64,
    pub sources: Vec<Source>,
    pub beat: BeatInfo,
}

impl BeatEvent {
    pub fn new(info: &BeatInfo, counter: u64, sources: &[Source]) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type: info.name.clone(),
            counter,
            sources: sources.to_vec(),
            beat: info.clone(),
        }
    }
}
