//! Optional TOML configuration files.
//!
//! Every value a binary accepts as a flag can also live in a config
//! file; flags override file values. Absent file and absent flag fall
//! back to the built-in defaults where one exists.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// File-backed settings for `dropgate-send`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendFileConfig {
    pub host: Option<String>,
    pub folder: Option<PathBuf>,
    pub interval_secs: Option<u64>,
    pub parallel: Option<usize>,
    pub chunk_size: Option<usize>,
    pub certificate: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub cert_authority: Option<PathBuf>,
}

/// File-backed settings for `dropgate-recv`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecvFileConfig {
    pub port: Option<u16>,
    pub storage: Option<PathBuf>,
    pub allow: Option<Vec<String>>,
    pub certificate: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub cert_authority: Option<PathBuf>,
}

/// Loads a config file, or the all-`None` default when no path is given.
pub fn load<T>(path: Option<&Path>) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    let Some(path) = path else {
        return Ok(T::default());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}
