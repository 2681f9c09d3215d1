// src/engine/mod.rs

//! Async IO shell around the driver core.
//!
//! [`Runtime`] owns the event loop: it pulls [`DriverEvent`]s off the
//! channel, feeds them to the pure core, and executes the resulting
//! commands. [`ActionSpawner`] abstracts how dispatched actions actually
//! run; [`TokioSpawner`] is the production implementation.
//!
//! [`DriverEvent`]: crate::driver::DriverEvent

pub mod runtime;
pub mod spawner;

pub use runtime::Runtime;
pub use spawner::{ActionSpawner, TokioSpawner};
