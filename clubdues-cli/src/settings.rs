use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

/// Operator-facing configuration, loaded from an optional TOML file with
/// `CLUBDUES_*` environment overrides layered on top.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Path to the SQLite database holding payments and counters.
    pub database: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: PathBuf::from("clubdues.db"),
        }
    }
}

pub fn load(path: &Path) -> Result<Settings> {
    let settings = Config::builder()
        .add_source(File::from(path.to_path_buf()).required(false))
        .add_source(Environment::with_prefix("CLUBDUES"))
        .build()
        .context("building configuration")?
        .try_deserialize()
        .context("deserializing configuration")?;
    Ok(settings)
}
