//! Resolved run configuration.
//!
//! Layers, lowest first: built-in defaults, an optional TOML file, then
//! command-line flags (applied by the binary).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{CleanerError, Result};
use super::rules::{split_csv, RuleSet};
use super::tracker::DEFAULT_PREFIX;

pub const DEFAULT_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_BATCH_SIZE: usize = 500;
const CONFIG_DIR_NAME: &str = "recup-cleaner";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the numbered recovery folders.
    pub input: Option<PathBuf>,
    /// Extensions to keep; entries may themselves be comma-separated.
    pub keep: Vec<String>,
    /// Extensions to delete, overriding `keep`.
    pub exclude: Vec<String>,
    pub reorganize: bool,
    pub log: bool,
    /// Where the action log goes; defaults to the input directory.
    pub log_dir: Option<PathBuf>,
    pub interval_secs: u64,
    pub batch_size: usize,
    pub folder_prefix: String,
    /// Clean everything once and exit instead of monitoring.
    pub once: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: None,
            keep: Vec::new(),
            exclude: Vec::new(),
            reorganize: false,
            log: false,
            log_dir: None,
            interval_secs: DEFAULT_INTERVAL_SECS,
            batch_size: DEFAULT_BATCH_SIZE,
            folder_prefix: DEFAULT_PREFIX.to_string(),
            once: false,
        }
    }
}

impl Config {
    /// `<config_dir>/recup-cleaner/config.toml`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| CleanerError::ConfigParse {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| CleanerError::ConfigRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Load an explicit file, else the default file if present, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load_from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn keep_list(&self) -> Vec<String> {
        self.keep.iter().flat_map(|e| split_csv(e)).collect()
    }

    pub fn exclude_list(&self) -> Vec<String> {
        self.exclude.iter().flat_map(|e| split_csv(e)).collect()
    }

    pub fn rules(&self) -> Result<RuleSet> {
        RuleSet::new(self.keep_list(), self.exclude_list())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref().or(self.input.as_deref())
    }

    /// Check everything that must hold before scanning begins.
    pub fn validate(&self) -> Result<()> {
        let input = self.input.as_ref().ok_or(CleanerError::MissingInputPath)?;
        if !input.exists() {
            return Err(CleanerError::DirectoryNotFound {
                path: input.clone(),
            });
        }
        if !input.is_dir() {
            return Err(CleanerError::InputNotADirectory {
                path: input.clone(),
            });
        }
        self.rules()?;
        if self.batch_size == 0 {
            return Err(CleanerError::InvalidBatchSize {
                size: self.batch_size,
            });
        }
        if self.interval_secs == 0 {
            return Err(CleanerError::InvalidInterval {
                seconds: self.interval_secs,
            });
        }
        Ok(())
    }
}
