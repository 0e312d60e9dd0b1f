//! Reader configuration
//!
//! Defaults are overridden by an optional TOML file, which the binary's
//! command-line flags override in turn.

use crate::audio::{DEFAULT_AUDIO_BASE_URL, DEFAULT_AUDIO_BITRATE, DEFAULT_RECITER};
use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::client::{DEFAULT_API_BASE_URL, DEFAULT_TRANSLATION};
use crate::navigation::DEFAULT_PAGE_SIZE;
use crate::prefetch::DEFAULT_PREFETCH_COUNT;
use crate::voice::{DEFAULT_LOCALE, DEFAULT_VOICE_TIMEOUT};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Invalid TOML in {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl From<ConfigError> for crate::error::ReaderError {
    fn from(err: ConfigError) -> Self {
        crate::error::ReaderError::Config(err.to_string())
    }
}

/// `config.toml` contents. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub api_base_url: Option<String>,
    pub translation: Option<String>,
    pub audio_base_url: Option<String>,
    pub audio_bitrate: Option<u32>,
    pub reciter: Option<String>,
    pub cache_capacity: Option<usize>,
    pub prefetch_count: Option<u16>,
    pub page_size: Option<u16>,
    pub voice_locale: Option<String>,
    pub voice_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: String,
    pub translation: String,
    pub audio_base_url: String,
    pub audio_bitrate: u32,
    pub reciter: String,
    pub cache_capacity: usize,
    pub prefetch_count: u16,
    pub page_size: u16,
    pub voice_locale: String,
    pub voice_timeout: Duration,
    pub request_timeout: Duration,
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            translation: DEFAULT_TRANSLATION.to_string(),
            audio_base_url: DEFAULT_AUDIO_BASE_URL.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE,
            reciter: DEFAULT_RECITER.to_string(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            prefetch_count: DEFAULT_PREFETCH_COUNT,
            page_size: DEFAULT_PAGE_SIZE,
            voice_locale: DEFAULT_LOCALE.to_string(),
            voice_timeout: DEFAULT_VOICE_TIMEOUT,
            request_timeout: Duration::from_secs(30),
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    pub fn settings_db_path(&self) -> PathBuf {
        self.data_dir.join("settings.db")
    }

    /// Apply the values present in `file` on top of `self`.
    pub fn merge(mut self, file: ConfigFile) -> Result<Self, ConfigError> {
        if let Some(v) = file.api_base_url {
            self.api_base_url = v;
        }
        if let Some(v) = file.translation {
            self.translation = v;
        }
        if let Some(v) = file.audio_base_url {
            self.audio_base_url = v;
        }
        if let Some(v) = file.audio_bitrate {
            self.audio_bitrate = v;
        }
        if let Some(v) = file.reciter {
            self.reciter = v;
        }
        if let Some(v) = file.cache_capacity {
            if v == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "cache_capacity",
                    reason: "must be at least 1".to_string(),
                });
            }
            self.cache_capacity = v;
        }
        if let Some(v) = file.prefetch_count {
            self.prefetch_count = v;
        }
        if let Some(v) = file.page_size {
            if v == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "page_size",
                    reason: "must be at least 1".to_string(),
                });
            }
            self.page_size = v;
        }
        if let Some(v) = file.voice_locale {
            self.voice_locale = v;
        }
        if let Some(v) = file.voice_timeout_secs {
            self.voice_timeout = Duration::from_secs(v);
        }
        if let Some(v) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(v);
        }
        if let Some(v) = file.data_dir {
            self.data_dir = v;
        }
        Ok(self)
    }
}

/// Platform data directory for the reader, e.g. `~/.local/share/tilawa`.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("tilawa"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

/// `~/.config/tilawa/config.toml` or the platform equivalent.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tilawa").join("config.toml"))
}

/// Load a config file. A missing file is not an error.
pub fn load_config_file(path: &Path) -> Result<Option<ConfigFile>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_config(path, &contents).map(Some)
}

fn parse_config(path: &Path, contents: &str) -> Result<ConfigFile, ConfigError> {
    toml::from_str(contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Defaults merged with the file at `path` (or the default location).
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => default_config_path(),
    };
    let file = match path {
        Some(p) => load_config_file(&p)?,
        None => None,
    };
    Config::default().merge(file.unwrap_or_default())
}
