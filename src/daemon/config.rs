//! Daemon configuration
//!
//! Sectioned configuration for the watcher daemon: capture device, script
//! location, store root, poll timing, and logging. Files are loaded by
//! extension (TOML or JSON).

use crate::{ApWatchError, Result, BEACON_FRAME_MAX_LENGTH};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Frame capture settings
    pub capture: CaptureConfig,
    /// Extraction script settings
    pub script: ScriptConfig,
    /// Fingerprint store settings
    pub store: StoreConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Frame capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Device or file the raw frames are read from
    pub device: PathBuf,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Largest frame accepted from the device, in bytes
    pub max_frame_size: usize,
}

/// Extraction script configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Path to the script compiled at startup
    pub path: PathBuf,
}

/// Fingerprint store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root directory for the per-script CSV databases
    pub root: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            script: ScriptConfig::default(),
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/wlan-beacon"),
            poll_interval_ms: 1000,
            max_frame_size: BEACON_FRAME_MAX_LENGTH,
        }
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/etc/apwatch/fingerprint.aws"),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/var/lib/apwatch"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML or JSON file, picked by extension.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ApWatchError::Config(format!("Failed to read config file: {}", e)))?;

        let config: DaemonConfig = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| ApWatchError::Config(format!("Failed to parse JSON config: {}", e)))?,
            Some("toml") => toml::from_str(&content)
                .map_err(|e| ApWatchError::Config(format!("Failed to parse TOML config: {}", e)))?,
            _ => {
                return Err(ApWatchError::Config(
                    "Unsupported config file format".to_string(),
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.capture.device.as_os_str().is_empty() {
            errors.push("Capture device cannot be empty".to_string());
        }

        if self.capture.poll_interval_ms == 0 {
            errors.push("Poll interval cannot be 0".to_string());
        }

        if self.capture.max_frame_size == 0 {
            errors.push("Max frame size cannot be 0".to_string());
        }

        if self.script.path.as_os_str().is_empty() {
            errors.push("Script path cannot be empty".to_string());
        }

        if self.store.root.as_os_str().is_empty() {
            errors.push("Store root cannot be empty".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            errors.push(format!(
                "Invalid log level '{}', must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApWatchError::Config(errors.join(", ")))
        }
    }

    /// Render the configuration as pretty-printed TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ApWatchError::Config(format!("Failed to serialize config: {}", e)))
    }
}
