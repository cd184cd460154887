//! Configuration management for hw-inventory
//!
//! Config file location:
//! - Linux: ~/.config/hw-inventory/config.toml
//! - macOS: ~/Library/Application Support/io.hw-inventory.hw-inventory/config.toml
//! - Windows: %APPDATA%/hw-inventory/hw-inventory/config/config.toml
//!
//! You can override the config location by setting `HW_INVENTORY_CONFIG_PATH`,
//! and the sysfs chroot by setting `HW_INVENTORY_CHROOT`.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Where to read hardware metadata from
    #[serde(default)]
    pub paths: PathsConfig,

    /// Diagnostic output
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Report rendering
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from file or create default
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path; a missing file yields defaults
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(config_path, toml)
            .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(path) = non_empty_env("HW_INVENTORY_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let proj_dirs = ProjectDirs::from("io", "hw-inventory", "hw-inventory")
            .context("Could not determine project directories")?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Create default config file if it doesn't exist
    pub fn init() -> Result<Self> {
        let config = Self::load()?;

        let config_path = Self::config_path()?;
        if !config_path.exists() {
            config.save()?;
        }

        Ok(config)
    }

    /// Chroot to use, `HW_INVENTORY_CHROOT` taking precedence over the file
    pub fn effective_chroot(&self) -> PathBuf {
        non_empty_env("HW_INVENTORY_CHROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(&self.paths.chroot))
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Path configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root the sysfs paths are resolved against ("/" on a live system)
    #[serde(default = "default_chroot")]
    pub chroot: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            chroot: default_chroot(),
        }
    }
}

fn default_chroot() -> String {
    "/".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Report format
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}
