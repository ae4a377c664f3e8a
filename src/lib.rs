pub mod app;
pub mod collector;
pub mod config;
pub mod error;
pub mod logging;
pub mod signals;

pub use crate::app::{BeatController, ProcessState, ShutdownHandle, ShutdownReason};
pub use crate::collector::{BeatCollector, BeatEvent, BeatInfo, Collector, LogPublisher, Publisher};
pub use crate::config::ZfsbeatConfig;
pub use crate::error::{Result, ZfsbeatError};
pub use crate::logging::{init_logging, LogOverrides, LogRecord, LogSink};
pub use crate::signals::{ShutdownLatch, ShutdownListener, SignalBridge};
