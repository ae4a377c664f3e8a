//! Log output for the beat.
//!
//! [`LogSink`] is the append-only record stream the lifecycle writes to;
//! every record is forwarded to `tracing`, whose subscriber is installed by
//! [`init_logging`].

mod sink;
mod subscriber;

pub use sink::{LogRecord, LogSink};
pub use subscriber::{init_logging, LogOverrides};
