//! Common configuration types shared across bzpsp crates

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Unknown audio mode '{0}' (expected all, at3 or bnk)")]
    UnknownAudioMode(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Which audio assets the audio extractor handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioMode {
    /// Copy .at3 streams and unpack .bnk banks
    #[default]
    All,
    /// Only copy .at3 streams
    At3,
    /// Only unpack .bnk banks
    Bnk,
}

impl AudioMode {
    pub fn copies_at3(&self) -> bool {
        matches!(self, AudioMode::All | AudioMode::At3)
    }

    pub fn unpacks_banks(&self) -> bool {
        matches!(self, AudioMode::All | AudioMode::Bnk)
    }
}

impl FromStr for AudioMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(AudioMode::All),
            "at3" => Ok(AudioMode::At3),
            "bnk" => Ok(AudioMode::Bnk),
            _ => Err(ConfigError::UnknownAudioMode(s.to_string())),
        }
    }
}

/// Settings for the level package extractor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LvlConfig {
    /// Maximum number of packages to process (0 = all)
    pub limit: usize,
}

/// Settings for the audio extractor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub mode: AudioMode,
    /// Decode embedded VAG streams to WAV
    pub decode_vag: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            mode: AudioMode::All,
            decode_vag: true,
        }
    }
}

/// Application-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    /// Worker threads for batch decoding (None = one per core)
    pub threads: Option<usize>,
    pub lvl: LvlConfig,
    pub audio: AudioConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            threads: None,
            lvl: LvlConfig::default(),
            audio: AudioConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
