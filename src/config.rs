//! Configuration management
//!
//! Configuration is stored in TOML format at `~/.npym/config.toml`. Every
//! field has a default, so a missing file yields a working configuration
//! pointed at the public NPM registry.
//!
//! # Examples
//!
//! ```no_run
//! use npym::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! println!("Python names start with: {}", config.prefix);
//! # Ok(())
//! # }
//! ```

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{npm, Error, Result};

/// User configuration file (`~/.npym/config.toml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Fixed leading label of every synthesized Python name.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Base URL of the NPM registry.
    #[serde(default = "default_registry_url")]
    pub registry_url: String,

    /// URL of the all-package-names feed consumed by the import pass.
    #[serde(default = "default_names_url")]
    pub names_url: String,

    /// How many names each import chunk carries.
    #[serde(default = "default_import_chunk_size")]
    pub import_chunk_size: usize,

    /// Root directory for archive blobs.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
}

fn default_prefix() -> String {
    "npym".to_string()
}

fn default_registry_url() -> String {
    "https://registry.npmjs.org".to_string()
}

fn default_names_url() -> String {
    npm::NAMES_JSON.to_string()
}

fn default_import_chunk_size() -> usize {
    10_000
}

fn default_storage_dir() -> PathBuf {
    home_dir().join(".npym").join("storage")
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            registry_url: default_registry_url(),
            names_url: default_names_url(),
            import_chunk_size: default_import_chunk_size(),
            storage_dir: default_storage_dir(),
        }
    }
}

impl Config {
    /// Path of the configuration file.
    pub fn config_path() -> PathBuf {
        home_dir().join(".npym").join("config.toml")
    }

    /// Load the configuration, falling back to defaults when the file does
    /// not exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Write the configuration back to disk.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        let parent = path
            .parent()
            .ok_or_else(|| Error::Other("config path has no parent directory".to_string()))?;

        fs::create_dir_all(parent)?;
        fs::write(&path, toml::to_string_pretty(self)?)?;

        Ok(())
    }
}
