//! Configuration loading.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{HenhouseError, Result};

/// Name of the config file inside the platform config directory.
pub const CONFIG_FILE: &str = "henhouse.toml";

/// Henhouse configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HenhouseConfig {
    /// Data directory for the database and logs
    pub data_dir: PathBuf,
    /// Database file name, relative to `data_dir`
    pub database_file: String,
    /// `EnvFilter` directives used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Write logs to a daily rolling file under `data_dir/logs`
    pub log_to_file: bool,
    /// Page size when a list request gives no limit
    pub default_page_size: u32,
    /// Largest page size a list request may ask for
    pub max_page_size: u32,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "henhouse")
}

impl Default for HenhouseConfig {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("henhouse-data"));

        Self {
            data_dir,
            database_file: "henhouse.db".to_string(),
            log_filter: "info".to_string(),
            log_to_file: false,
            default_page_size: 50,
            max_page_size: 500,
        }
    }
}

impl HenhouseConfig {
    /// Load configuration from `path`, or from the platform config directory.
    ///
    /// A missing file yields defaults; an unreadable or malformed one is an
    /// error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match project_dirs() {
                Some(dirs) => dirs.config_dir().join(CONFIG_FILE),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
            .map_err(|e| HenhouseError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: HenhouseConfig =
            toml::from_str(content).map_err(|e| HenhouseError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_page_size == 0 {
            return Err(HenhouseError::Config(
                "default_page_size must be greater than 0".to_string(),
            ));
        }
        if self.max_page_size < self.default_page_size {
            return Err(HenhouseError::Config(
                "max_page_size must not be smaller than default_page_size".to_string(),
            ));
        }
        Ok(())
    }

    /// Full path of the database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}
