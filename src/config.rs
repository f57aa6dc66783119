//! Configuration file support for VXT.
//!
//! Settings are stored as JSON in the user's config directory and can be
//! overridden by passing a file path on the command line.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vxt_service::ServiceConfig;

use crate::constants::{DEFAULT_FRAME_CACHE_SIZE, DEFAULT_LABEL, STATUS_MESSAGE_SECS};
use crate::keybindings::KeyBindings;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Review preferences section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Save the outgoing sequence's annotations when navigating away
    pub autosave: bool,

    /// Load and show annotation boxes and points
    pub show_annotations: bool,

    /// Timeseries feeding the plot and the detection boxes
    pub detection_timeseries: Option<String>,

    /// Plot y column
    pub y_column: Option<String>,

    /// Column coloring plot markers and detection boxes
    pub z_column: Option<String>,

    /// Labels offered for new boxes; the first is selected initially
    pub labels: Vec<String>,

    /// Number of decoded frames kept in memory
    pub frame_cache_size: usize,

    /// Seconds an inline status message stays visible
    pub status_message_secs: u64,

    /// Log verbosity level
    pub log_level: LogLevel,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            autosave: true,
            show_annotations: true,
            detection_timeseries: None,
            y_column: None,
            z_column: None,
            labels: vec![DEFAULT_LABEL.to_string()],
            frame_cache_size: DEFAULT_FRAME_CACHE_SIZE,
            status_message_secs: STATUS_MESSAGE_SECS,
            log_level: LogLevel::default(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Data service connection
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub preferences: Preferences,

    #[serde(default)]
    pub keybindings: KeyBindings,
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            service: ServiceConfig::default(),
            preferences: Preferences::default(),
            keybindings: KeyBindings::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    pub fn default_filename() -> &'static str {
        "vxt-config.json"
    }

    /// Default config file path.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("vxt").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home| home.join(".config").join("vxt").join(Self::default_filename()))
        }
    }

    /// Load configuration from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {path:?}");
        Ok(config)
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {path:?}");
            return None;
        }
        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {path:?}: {e}");
                None
            }
        }
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {path:?}");
        Ok(())
    }

    /// Save configuration to the default path.
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save(&path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
