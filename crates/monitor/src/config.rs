//! Monitor configuration
//!
//! Layered with the `config` crate:
//! 1. Built-in defaults
//! 2. Optional TOML file (`--config <path>`)
//! 3. Environment overrides, e.g. `DBM_LOGGING__LEVEL=debug` or
//!    `DBM_CONTEXT__WEATHER_API_KEY=...`

use std::path::Path;

use behavior_engine::{EngineConfig, EngineError};
use config::{Config, Environment, File, FileFormat};
use context_adapter::ContextConfig;
use driving_events::EventsConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] EngineError),
}

/// Threshold preset applied over `engine.events`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    /// Use `engine.events` as configured
    #[default]
    Custom,
    Strict,
    Lenient,
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    pub level: String,

    /// Emit JSON log lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Replay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Buffer size of each in-process sensor channel
    pub channel_capacity: usize,

    /// Publish records as fast as they are read instead of at recorded pace
    pub fast: bool,

    /// How long to keep the engine running after the last record
    /// (milliseconds); defaults to the sharp-turn hold so pending
    /// timers still fire
    pub drain_ms: Option<u64>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            channel_capacity: sensor_source::channel::DEFAULT_CAPACITY,
            fast: false,
            drain_ms: None,
        }
    }
}

/// Top-level monitor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub sensitivity: Sensitivity,
    pub engine: EngineConfig,

    /// Look up weather, traffic and road type for new fixes
    pub context_enabled: bool,
    pub context: ContextConfig,

    pub logging: LoggingConfig,
    pub replay: ReplayConfig,
}

impl MonitorConfig {
    /// Load defaults, then the optional file, then `DBM_*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix("DBM")
                .prefix_separator("_")
                .separator("__"),
        );
        Self::from_config(builder.build()?)
    }

    /// Parse a TOML document (no environment overrides)
    pub fn from_toml(document: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(document, FileFormat::Toml))
            .build()?;
        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self, ConfigError> {
        let mut monitor: MonitorConfig = config.try_deserialize()?;
        monitor.apply_sensitivity();
        monitor.engine.validate()?;
        Ok(monitor)
    }

    fn apply_sensitivity(&mut self) {
        let preset = match self.sensitivity {
            Sensitivity::Custom => return,
            Sensitivity::Strict => EventsConfig::strict(),
            Sensitivity::Lenient => EventsConfig::lenient(),
        };
        // Presets keep the configured calibration mode
        let calibration = self.engine.events.longitudinal.calibration;
        self.engine.events = preset;
        self.engine.events.longitudinal.calibration = calibration;
    }

    /// Time to wait after the last record before shutting down
    pub fn drain_ms(&self) -> u64 {
        self.replay
            .drain_ms
            .unwrap_or(self.engine.events.angular.hold_ms)
    }
}
