use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, error, info, trace, warn, Level};

/// A single entry in the beat's log stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Position in the stream, starting at 0
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
}

/// Append-only stream of log records shared between the controller and
/// whoever needs to observe it
#[derive(Debug)]
pub struct LogSink {
    records: RwLock<Vec<LogRecord>>,
    forward: bool,
}

impl LogSink {
    /// Create a sink that also forwards every record to `tracing`
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            forward: true,
        }
    }

    /// Create a sink that only keeps records in memory
    pub fn in_memory() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            forward: false,
        }
    }

    /// Append a record and return its sequence number
    pub fn log<S: Into<String>>(&self, level: Level, message: S) -> u64 {
        let message = message.into();
        let seq = {
            let mut records = self.records.write();
            let seq = records.len() as u64;
            records.push(LogRecord {
                seq,
                timestamp: Utc::now(),
                level,
                message: message.clone(),
            });
            seq
        };

        if self.forward {
            forward(level, &message);
        }

        seq
    }

    pub fn info<S: Into<String>>(&self, message: S) -> u64 {
        self.log(Level::INFO, message)
    }

    pub fn warn<S: Into<String>>(&self, message: S) -> u64 {
        self.log(Level::WARN, message)
    }

    pub fn error<S: Into<String>>(&self, message: S) -> u64 {
        self.log(Level::ERROR, message)
    }

    /// Snapshot of all records in append order
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Whether any record's message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.records
            .read()
            .iter()
            .any(|record| record.message.contains(needle))
    }

    /// Number of records whose message contains `needle`
    pub fn count_matching(&self, needle: &str) -> usize {
        self.records
            .read()
            .iter()
            .filter(|record| record.message.contains(needle))
            .count()
    }

    /// Sequence number of the first record containing `needle`
    pub fn position(&self, needle: &str) -> Option<u64> {
        self.records
            .read()
            .iter()
            .find(|record| record.message.contains(needle))
            .map(|record| record.seq)
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

fn forward(level: Level, message: &str) {
    match level {
        Level::ERROR => error!(target: "zfsbeat", "{}", message),
        Level::WARN => warn!(target: "zfsbeat", "{}", message),
        Level::INFO => info!(target: "zfsbeat", "{}", message),
        Level::DEBUG => debug!(target: "zfsbeat", "{}", message),
        Level::TRACE => trace!(target: "zfsbeat", "{}", message),
    }
}
