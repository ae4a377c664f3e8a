mod controller;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use controller::{BeatController, ShutdownHandle};
pub use types::{ProcessState, ShutdownReason};
