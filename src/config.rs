//! On-disk configuration
//!
//! One TOML file covering the pad wiring and the poll cadence. A missing
//! file is written out with defaults on first run so there is always a
//! concrete file to edit; a malformed file is a startup error rather than
//! a silent fallback.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::scheduler::PollSettings;

/// BCM pin numbers of the three pad lines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinConfig {
    pub clock: u8,
    pub latch: u8,
    pub data: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        // Stock wiring on the Pi header
        Self {
            clock: 17,
            latch: 27,
            data: 22,
        }
    }
}

/// Complete pad configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PadConfig {
    pub device_name: String,
    pub pins: PinConfig,
    pub poll: PollSettings,
}

impl Default for PadConfig {
    fn default() -> Self {
        Self {
            device_name: "SNES-Controller".to_string(),
            pins: PinConfig::default(),
            poll: PollSettings::default(),
        }
    }
}

// Config file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to encode default config: {0}")]
    Encode(#[from] toml::ser::Error),
}

impl PadConfig {
    /// Default config location: `<user config dir>/snespad/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("snespad").join("config.toml"))
    }

    /// Loads an existing config file.
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&raw).map_err(|source| ConfigFileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Loads the config, creating it with defaults first if missing.
    pub fn ensure(path: &Path) -> Result<Self, ConfigFileError> {
        if path.exists() {
            return Self::load(path);
        }

        let config = Self::default();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigFileError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let raw = toml::to_string_pretty(&config)?;
        fs::write(path, raw).map_err(|source| ConfigFileError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        info!("wrote default config to {}", path.display());
        Ok(config)
    }
}
