// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForageError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// A `BuildContext` operation was invoked after the action already
    /// reported an outcome.
    #[error("Action is not running")]
    ActionNotRunning,

    /// The action reported `success`/`passed` while dependencies it looked up
    /// were still unresolved.
    #[error("Action reported success despite missing dependencies")]
    UnresolvedDependencies,

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ForageError>;
