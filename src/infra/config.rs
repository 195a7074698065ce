//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::domain::{ChannelGroup, DEFAULT_SEPARATOR};
use anyhow::{bail, Context};
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct SerialConfig {
    #[serde(default = "default_serial_device")]
    pub device: String,
    #[serde(default = "default_serial_baud")]
    pub baud: u32,
    /// Per-line read timeout; a silent port yields no line after this long
    #[serde(default = "default_line_timeout_ms")]
    pub line_timeout_ms: u64,
}

fn default_serial_device() -> String {
    "/dev/tty.usbmodem14701".to_string()
}

fn default_serial_baud() -> u32 {
    115200
}

fn default_line_timeout_ms() -> u64 {
    1000
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: default_serial_device(),
            baud: default_serial_baud(),
            line_timeout_ms: default_line_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FramingConfig {
    #[serde(default = "default_separator")]
    pub separator: char,
    /// Give up on a block after this long (absent: wait indefinitely)
    #[serde(default)]
    pub block_timeout_ms: Option<u64>,
}

fn default_separator() -> char {
    DEFAULT_SEPARATOR
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self { separator: default_separator(), block_timeout_ms: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,
    #[serde(default = "default_y_max")]
    pub y_max: u64,
}

fn default_refresh_ms() -> u64 {
    100
}

fn default_y_max() -> u64 {
    5000
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { refresh_ms: default_refresh_ms(), y_max: default_y_max() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log destination while the terminal UI owns the screen
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_file() -> String {
    "spectra-monitor.log".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { file: default_log_file() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub framing: FramingConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub groups: Option<Vec<ChannelGroup>>,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    serial_device: String,
    serial_baud: u32,
    line_timeout_ms: u64,
    separator: char,
    block_timeout_ms: Option<u64>,
    refresh_ms: u64,
    y_max: u64,
    log_file: String,
    groups: Vec<ChannelGroup>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial_device: default_serial_device(),
            serial_baud: default_serial_baud(),
            line_timeout_ms: default_line_timeout_ms(),
            separator: DEFAULT_SEPARATOR,
            block_timeout_ms: None,
            refresh_ms: default_refresh_ms(),
            y_max: default_y_max(),
            log_file: default_log_file(),
            groups: ChannelGroup::defaults(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Determine config file path from args or environment
    pub fn resolve_config_path(arg: Option<&str>) -> String {
        if let Some(path) = arg {
            return path.to_string();
        }

        // Check CONFIG_FILE environment variable
        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        // Default to dev.toml
        "config/dev.toml".to_string()
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str, origin: &str) -> anyhow::Result<Self> {
        let toml_config: TomlConfig = toml::from_str(content)
            .with_context(|| format!("Failed to parse config file {}", origin))?;

        let config = Self {
            serial_device: toml_config.serial.device,
            serial_baud: toml_config.serial.baud,
            line_timeout_ms: toml_config.serial.line_timeout_ms,
            separator: toml_config.framing.separator,
            block_timeout_ms: toml_config.framing.block_timeout_ms,
            refresh_ms: toml_config.display.refresh_ms,
            y_max: toml_config.display.y_max,
            log_file: toml_config.log.file,
            groups: toml_config.groups.unwrap_or_else(ChannelGroup::defaults),
            config_file: origin.to_string(),
        };

        config.validate().with_context(|| format!("Invalid config file {}", origin))?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    /// when the file does not exist. A file that exists but is invalid is an error.
    pub fn load_from_path(path: &str) -> anyhow::Result<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// True when no config file was read
    pub fn is_default(&self) -> bool {
        self.config_file == "default"
    }

    /// Check the invariants the framing protocol relies on
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.groups.is_empty() {
            bail!("at least one channel group is required");
        }

        let mut seen = HashSet::new();
        for group in &self.groups {
            if group.labels.is_empty() {
                bail!("group {} has no channel labels", group.name);
            }
            if group.sentinel.as_str().contains(self.separator) {
                bail!(
                    "group {} sentinel {:?} contains the field separator {:?}",
                    group.name,
                    group.sentinel.as_str(),
                    self.separator
                );
            }
            if !seen.insert(group.sentinel.as_str()) {
                bail!("sentinel {:?} is used by more than one group", group.sentinel.as_str());
            }
        }

        if self.separator.is_whitespace() {
            bail!("field separator must not be whitespace");
        }
        if self.serial_baud == 0 {
            bail!("serial baud must be positive");
        }
        if self.refresh_ms == 0 {
            bail!("display refresh_ms must be positive");
        }
        Ok(())
    }

    /// Point at a different serial device (command line override)
    pub fn with_serial_device(mut self, device: impl Into<String>) -> Self {
        self.serial_device = device.into();
        self
    }

    /// Use a different baud rate (command line override)
    pub fn with_serial_baud(mut self, baud: u32) -> Self {
        self.serial_baud = baud;
        self
    }

    /// Apply command line overrides and re-check the result
    pub fn with_overrides(
        mut self,
        device: Option<String>,
        baud: Option<u32>,
    ) -> anyhow::Result<Self> {
        if let Some(device) = device {
            self = self.with_serial_device(device);
        }
        if let Some(baud) = baud {
            self = self.with_serial_baud(baud);
        }
        self.validate().context("Invalid command line override")?;
        Ok(self)
    }

    // Getters for all config fields
    pub fn serial_device(&self) -> &str {
        &self.serial_device
    }

    pub fn serial_baud(&self) -> u32 {
        self.serial_baud
    }

    pub fn line_timeout(&self) -> Duration {
        Duration::from_millis(self.line_timeout_ms)
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn block_timeout(&self) -> Option<Duration> {
        self.block_timeout_ms.map(Duration::from_millis)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }

    pub fn y_max(&self) -> u64 {
        self.y_max
    }

    pub fn log_file(&self) -> &str {
        &self.log_file
    }

    pub fn groups(&self) -> &[ChannelGroup] {
        &self.groups
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to replace the channel groups
    #[cfg(test)]
    pub fn with_groups(mut self, groups: Vec<ChannelGroup>) -> Self {
        self.groups = groups;
        self
    }

    /// Builder method for tests to set a block deadline
    #[cfg(test)]
    pub fn with_block_timeout_ms(mut self, ms: u64) -> Self {
        self.block_timeout_ms = Some(ms);
        self
    }
}
