//! Collection work driven by the lifecycle controller.
//!
//! The controller only sees the [`Collector`] trait. [`BeatCollector`] is the
//! default implementation: it emits one [`BeatEvent`] per period to a
//! [`Publisher`].

mod beat;
mod event;
mod publisher;

pub use beat::{resolve_inputs, BeatCollector};
pub use event::{BeatEvent, BeatInfo};
pub use publisher::{LogPublisher, Publisher};

use crate::error::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Work unit owned by the controller for the lifetime of the process
#[async_trait]
pub trait Collector: Send {
    fn name(&self) -> &str;

    /// Acquire whatever the collector needs before the beat reports running
    async fn initialize(&mut self) -> Result<()>;

    /// Collect until `cancel` fires. Returning early asks the controller to
    /// shut down.
    async fn run(&mut self, cancel: CancellationToken) -> Result<()>;

    /// Release acquired resources. Called on every exit path, including a
    /// failed `initialize`, and must tolerate being called more than once.
    async fn close(&mut self) -> Result<()>;
}
