//! Configuration loading and data folder resolution

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Environment variable naming the data folder
pub const DATA_DIR_ENV: &str = "CRATEDIG_DATA_DIR";

/// Catalog file name inside the data folder
pub const CATALOG_FILE: &str = "ccmixter_data.jsonl";

/// Selection file name inside the data folder
pub const SELECTION_FILE: &str = "selected_uploads.txt";

/// Music output folder name inside the data folder
pub const MUSIC_DIR: &str = "music";

/// Data folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file (`data_dir` key)
/// 4. Compiled default (`./dataset`)
pub fn resolve_data_dir(cli_arg: Option<&Path>) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        return Ok(PathBuf::from(path));
    }

    // Priority 3: TOML config file
    if let Some(config_path) = config_file_path() {
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            if let Some(data_dir) = data_dir_from_config(&content)? {
                return Ok(data_dir);
            }
        }
    }

    // Priority 4: Compiled default
    Ok(PathBuf::from("dataset"))
}

/// Extract `data_dir` from config file contents
///
/// A malformed file is a `Config` error; a well-formed file without the key
/// yields `None` and resolution falls through to the default.
fn data_dir_from_config(content: &str) -> Result<Option<PathBuf>> {
    let config = toml::from_str::<toml::Value>(content)
        .map_err(|e| Error::Config(format!("bad config file: {}", e)))?;
    Ok(config
        .get("data_dir")
        .and_then(|v| v.as_str())
        .map(PathBuf::from))
}

/// Platform config file location (`<config dir>/cratedig/config.toml`)
fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cratedig").join("config.toml"))
}

/// Resolved locations of the catalog, selection file and music folder
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub data_dir: PathBuf,
}

impl DataPaths {
    /// Resolve from an optional CLI-supplied data folder
    pub fn resolve(cli_arg: Option<&Path>) -> Result<Self> {
        Ok(Self {
            data_dir: resolve_data_dir(cli_arg)?,
        })
    }

    /// Catalog JSONL file path
    pub fn catalog_file(&self) -> PathBuf {
        self.data_dir.join(CATALOG_FILE)
    }

    /// Selection file path
    pub fn selection_file(&self) -> PathBuf {
        self.data_dir.join(SELECTION_FILE)
    }

    /// Music output folder path
    pub fn music_dir(&self) -> PathBuf {
        self.data_dir.join(MUSIC_DIR)
    }
}
