// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{DriverConfig, RawDriverConfig};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawDriverConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawDriverConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawDriverConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// This is the recommended entry point: it reads the TOML, applies defaults,
/// and checks the concurrency cap and path sanity.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<DriverConfig> {
    let raw = load_from_path(&path)?;
    let config = DriverConfig::try_from(raw)?;
    Ok(config)
}

/// Default config path: `Forage.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Forage.toml")
}
