//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Pxx2Error, Result};
use crate::model::ModelSettings;
use crate::pxx2::protocol::{PXX2_LEN_REGISTRATION_ID, PXX2_MAX_CHANNELS, PXX2_MIN_CHANNELS};

/// Logical output channels available to the mixer
pub const MAX_OUTPUT_CHANNELS: usize = 32;

/// RF module slots (internal + external)
pub const MAX_MODULES: usize = 2;

/// Largest PPM center offset in microseconds
pub const MAX_PPM_CENTER_OFFSET: i16 = 500;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    pub model: ModelSettings,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Device path per module, in module order
    ///
    /// A single-module model may leave this empty to auto-detect its port.
    /// PXX2 frames carry no module address, so every module of a
    /// multi-module model needs a port of its own.
    #[serde(default)]
    pub ports: Vec<String>,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Cycle loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    /// Period between two frames for the same module
    #[serde(default = "default_cycle_period_ms")]
    pub cycle_period_ms: u64,

    /// Cycles between two status log lines
    #[serde(default = "default_log_interval_cycles")]
    pub log_interval_cycles: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily log files, empty for stdout only
    #[serde(default)]
    pub file_dir: String,
}

/// Frame capture configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CaptureConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_capture_dir")]
    pub dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

// Default value functions
fn default_baud_rate() -> u32 { 450_000 }

fn default_cycle_period_ms() -> u64 { 4 }
fn default_log_interval_cycles() -> u64 { 1000 }

fn default_log_level() -> String { "info".to_string() }

fn default_capture_dir() -> String { "./captures".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            ports: Vec::new(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            cycle_period_ms: default_cycle_period_ms(),
            log_interval_cycles: default_log_interval_cycles(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_dir: String::new(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_capture_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> Pxx2Error {
    Pxx2Error::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pxx2_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if ![115_200, 450_000, 921_600].contains(&self.serial.baud_rate) {
            return Err(invalid("baud_rate must be one of: 115200, 450000, 921600"));
        }

        if self.link.cycle_period_ms == 0 || self.link.cycle_period_ms > 100 {
            return Err(invalid("cycle_period_ms must be between 1 and 100"));
        }

        if self.link.log_interval_cycles == 0 {
            return Err(invalid("log_interval_cycles must be greater than 0"));
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("logging level must be one of: trace, debug, info, warn, error"));
        }

        if self.capture.enabled && self.capture.dir.is_empty() {
            return Err(invalid("capture dir cannot be empty when enabled"));
        }

        if self.capture.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.capture.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        self.validate_model()?;
        self.validate_ports()
    }

    fn validate_ports(&self) -> Result<()> {
        let ports = &self.serial.ports;
        let modules = self.model.modules.len();

        if ports.is_empty() && modules == 1 {
            return Ok(());
        }

        if ports.len() != modules {
            return Err(invalid(format!(
                "serial ports lists {} device(s) for {} module(s); each module needs its own port",
                ports.len(),
                modules
            )));
        }

        if ports.iter().any(|p| p.is_empty()) {
            return Err(invalid("serial port paths cannot be empty"));
        }

        for (index, path) in ports.iter().enumerate() {
            if ports[..index].contains(path) {
                return Err(invalid(format!("serial port {} is shared by two modules", path)));
            }
        }

        Ok(())
    }

    fn validate_model(&self) -> Result<()> {
        let model = &self.model;

        if model.modules.is_empty() || model.modules.len() > MAX_MODULES {
            return Err(invalid(format!("model must define 1 to {} modules", MAX_MODULES)));
        }

        if model.registration_id.len() > PXX2_LEN_REGISTRATION_ID || !model.registration_id.is_ascii() {
            return Err(invalid(format!(
                "registration_id must be at most {} ASCII characters",
                PXX2_LEN_REGISTRATION_ID
            )));
        }

        if model.failsafe_channels.len() > MAX_OUTPUT_CHANNELS {
            return Err(invalid(format!(
                "failsafe_channels has {} entries (max {})",
                model.failsafe_channels.len(),
                MAX_OUTPUT_CHANNELS
            )));
        }

        if model.ppm_center.len() > MAX_OUTPUT_CHANNELS {
            return Err(invalid(format!(
                "ppm_center has {} entries (max {})",
                model.ppm_center.len(),
                MAX_OUTPUT_CHANNELS
            )));
        }

        let allowed = -MAX_PPM_CENTER_OFFSET..=MAX_PPM_CENTER_OFFSET;
        if model.ppm_center.iter().any(|offset| !allowed.contains(offset)) {
            return Err(invalid(format!(
                "ppm_center offsets must be within ±{}",
                MAX_PPM_CENTER_OFFSET
            )));
        }

        for (index, module) in model.modules.iter().enumerate() {
            if module.channels_count < PXX2_MIN_CHANNELS || module.channels_count > PXX2_MAX_CHANNELS {
                return Err(invalid(format!(
                    "module {}: channels_count must be between {} and {}",
                    index, PXX2_MIN_CHANNELS, PXX2_MAX_CHANNELS
                )));
            }

            // Channels are always sent in whole groups of 8
            let groups = (module.channels_count as usize).div_ceil(8);
            if module.channels_start as usize + groups * 8 > MAX_OUTPUT_CHANNELS {
                return Err(invalid(format!(
                    "module {}: channel window starting at {} exceeds {} channels",
                    index, module.channels_start, MAX_OUTPUT_CHANNELS
                )));
            }

            if module.model_id > 63 {
                return Err(invalid(format!("module {}: model_id must be between 0 and 63", index)));
            }
        }

        Ok(())
    }
}
