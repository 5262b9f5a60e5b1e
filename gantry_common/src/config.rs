//! Controller configuration file.
//!
//! One TOML document configures the whole controller. Every table and key
//! has a default, so an empty file describes a simulated gantry.
//!
//! | Table          | Type               |
//! |----------------|--------------------|
//! | `[shared]`     | [`SharedConfig`]   |
//! | `[machine]`    | `MachineConfig`    |
//! | `[motion]`     | `MotionConfig`     |
//! | `[homing]`     | `HomingConfig`     |
//! | `[storage]`    | `StorageConfig`    |
//! | `[peripheral]` | `PeripheralConfig` |
//! | `[wash]`       | `WashConfig`       |
//!
//! ```rust,no_run
//! use gantry_common::config::{ConfigError, GantryConfig};
//! use std::path::Path;
//!
//! let config = GantryConfig::load_file(Path::new("gantry.toml"))?;
//! println!("Backend: {}", config.machine.driver);
//! # Ok::<(), ConfigError>(())
//! ```

use crate::hal::config::{MachineConfig, PeripheralConfig};
use crate::motion::config::{MotionConfig, StorageConfig, WashConfig};
use crate::motion::homing::HomingConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;

/// Why a configuration could not be used.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// No file at the given path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// Unreadable file or invalid TOML (including unknown keys).
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Parsed, but a value is out of range.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Default log verbosity, written in lowercase in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Per-tick detail.
    Trace,
    /// Phase transitions and requests.
    Debug,
    /// Lifecycle and cycle steps.
    #[default]
    Info,
    /// Suppressed presses, overruns, recoverable failures.
    Warn,
    /// Aborted operations only.
    Error,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

fn default_service_name() -> String {
    "gantry".to_string()
}

/// `[shared]` table.
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "gantry-bench-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SharedConfig {
    /// Used when neither `RUST_LOG` nor `--verbose` is given.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Instance name reported in logs.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl SharedConfig {
    /// Reject an empty or blank `service_name`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "shared.service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

/// Read a TOML file into any deserializable type.
///
/// A missing file maps to `ConfigError::FileNotFound`; every other read or
/// syntax problem to `ConfigError::ParseError`. No semantic checks happen
/// here.
pub trait ConfigLoader: Sized + DeserializeOwned {
    /// Read and deserialize `path`.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::FileNotFound,
            _ => ConfigError::ParseError(format!("{}: {e}", path.display())),
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: DeserializeOwned> ConfigLoader for T {}

/// Complete controller configuration (one TOML file).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GantryConfig {
    /// Logging and instance identity.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Backend and axis hardware.
    #[serde(default)]
    pub machine: MachineConfig,

    /// Scheduler and back-off timing.
    #[serde(default)]
    pub motion: MotionConfig,

    /// Homing order and bounds.
    #[serde(default)]
    pub homing: HomingConfig,

    /// Calibration records and work-cycle log.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Peripheral controller link.
    #[serde(default)]
    pub peripheral: PeripheralConfig,

    /// Wash-cycle composition.
    #[serde(default)]
    pub wash: WashConfig,
}

impl GantryConfig {
    /// Load and validate a configuration file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.machine
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        self.peripheral
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        self.motion.validate().map_err(ConfigError::ValidationError)?;
        self.homing.validate().map_err(ConfigError::ValidationError)?;
        self.wash.validate().map_err(ConfigError::ValidationError)?;
        Ok(())
    }
}
