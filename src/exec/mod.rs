// src/exec/mod.rs

//! Stock subprocess actions and pattern rules.
//!
//! The driver core treats actions as opaque; these are the batteries
//! included for embedders that just want "run this command for every file
//! matching that pattern": [`CommandAction`] runs one shell command,
//! [`CommandRule`] is an [`ActionFactory`](crate::action::ActionFactory)
//! that stamps such actions out of templates.

pub mod command;
pub mod rule;

pub use command::CommandAction;
pub use rule::CommandRule;
