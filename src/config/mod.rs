// src/config/mod.rs

//! Driver configuration model and validation.
//!
//! ```toml
//! [driver]
//! max_concurrent_actions = 8
//! exit_when_idle = true
//!
//! [paths]
//! src = "src"
//! tmp = ".forage-tmp"
//! ```

use std::path::PathBuf;

use serde::Deserialize;

use crate::driver::DriverOptions;
use crate::errors::{ForageError, Result};

pub mod loader;

pub use loader::{default_config_path, load_and_validate, load_from_path};

pub const DEFAULT_MAX_CONCURRENT_ACTIONS: usize = 4;

/// Raw config exactly as deserialized from TOML, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDriverConfig {
    #[serde(default)]
    pub driver: DriverSection,
    pub paths: PathsSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverSection {
    pub max_concurrent_actions: Option<usize>,
    pub exit_when_idle: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    /// Root of the source tree to scan.
    pub src: String,
    /// Root of the temporary tree mirroring the source tree.
    pub tmp: String,
}

/// Validated configuration ready to construct a driver from.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub src: PathBuf,
    pub tmp: PathBuf,
    pub options: DriverOptions,
}

impl TryFrom<RawDriverConfig> for DriverConfig {
    type Error = ForageError;

    fn try_from(raw: RawDriverConfig) -> Result<Self> {
        let max_concurrent_actions = raw
            .driver
            .max_concurrent_actions
            .unwrap_or(DEFAULT_MAX_CONCURRENT_ACTIONS);
        if max_concurrent_actions == 0 {
            return Err(ForageError::ConfigError(
                "driver.max_concurrent_actions must be at least 1".to_string(),
            ));
        }

        if raw.paths.src.is_empty() {
            return Err(ForageError::ConfigError(
                "paths.src must not be empty".to_string(),
            ));
        }
        if raw.paths.tmp.is_empty() {
            return Err(ForageError::ConfigError(
                "paths.tmp must not be empty".to_string(),
            ));
        }
        if raw.paths.src == raw.paths.tmp {
            return Err(ForageError::ConfigError(
                "paths.tmp must not be the source tree itself".to_string(),
            ));
        }

        Ok(DriverConfig {
            src: PathBuf::from(raw.paths.src),
            tmp: PathBuf::from(raw.paths.tmp),
            options: DriverOptions {
                max_concurrent_actions,
                exit_when_idle: raw.driver.exit_when_idle.unwrap_or(true),
            },
        })
    }
}
