// src/lib.rs

//! Continuous discovery-based build driver.
//!
//! `forage` does not read a dependency graph; it finds one. The driver scans
//! a source tree, lets registered factories make actions out of the files it
//! encounters, and speculatively runs those actions. While an action runs it
//! declares, at runtime, which entities (named build artifacts: header
//! symbols, object files, tagged outputs) it consumes and produces. Asking
//! for an entity nobody has provided yet rolls the action back and parks it;
//! the action re-runs once some other action provides the entity. Committing
//! actions wake their waiters, fire factory triggers, and have their output
//! files rescanned for further work.
//!
//! See [`driver::Driver`] for the entry point.

pub mod action;
pub mod config;
pub mod dashboard;
pub mod driver;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;

pub use action::{Action, ActionFactory};
pub use dashboard::{ConsoleDashboard, Dashboard, Task, TaskState};
pub use driver::{BuildContext, Driver, DriverEvent, DriverOptions};
pub use errors::{ForageError, Result};
pub use fs::{FileHandle, FileSystem, RealFileSystem};
pub use types::{ActionId, ActionOutcome, EntityId};
