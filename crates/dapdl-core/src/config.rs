use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::fetcher::FailurePolicy;
use crate::manifest::DuplicatePolicy;

/// Global configuration loaded from `~/.config/dapdl/config.toml`.
/// Every key is optional in the file; missing keys take the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DapdlConfig {
    /// Root directory for downloaded files (None = current directory).
    pub output_dir: Option<PathBuf>,
    /// Drop a leading `data` folder from keys and directories.
    pub collapse_data: bool,
    /// Drop a leading `metadata` folder from keys and directories.
    pub collapse_metadata: bool,
    /// Worker threads for the fetch pool (None = available parallelism).
    pub workers: Option<usize>,
    /// "abort" stops the batch on the first failed item; "continue" reports failures at the end.
    pub failure_policy: FailurePolicy,
    /// "overwrite" lets a later manifest entry replace an earlier one with the same key; "reject" errors.
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for DapdlConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            collapse_data: true,
            collapse_metadata: false,
            workers: None,
            failure_policy: FailurePolicy::Abort,
            duplicate_policy: DuplicatePolicy::Overwrite,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dapdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<DapdlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = DapdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<DapdlConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: DapdlConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}
