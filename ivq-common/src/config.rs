//! Configuration loading and config file resolution
//!
//! Player configuration is a small TOML file. Every field has a built-in
//! default, so a missing file (or a file with only some sections) is not an
//! error.
//!
//! ```toml
//! [timing]
//! trigger_epsilon_secs = 0.5
//! countdown_secs = 5
//! fade_duration_ms = 1500
//! fade_steps = 30
//! progress_debounce_ms = 100
//! fade_curve = "linear"
//!
//! [logging]
//! level = "info"
//!
//! [display]
//! compact_breakpoint_px = 768
//! ```
//!
//! # Resolution priority
//!
//! 1. Command-line argument (highest priority)
//! 2. `IVQ_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/ivq/config.toml`)
//! 4. Built-in defaults (fallback)

use crate::{Error, FadeCurve, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "IVQ_CONFIG";

/// Complete player configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlayerConfig {
    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

/// Trigger, countdown, fade-in and debounce timing
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimingConfig {
    /// Tolerance around a trigger time when matching samples (seconds)
    #[serde(default = "default_trigger_epsilon_secs")]
    pub trigger_epsilon_secs: f64,

    /// Ticks of the countdown-to-continue after an accepted answer
    #[serde(default = "default_countdown_secs")]
    pub countdown_secs: u32,

    /// Total length of the resume volume ramp
    #[serde(default = "default_fade_duration_ms")]
    pub fade_duration_ms: u64,

    /// Number of volume steps in the resume ramp
    #[serde(default = "default_fade_steps")]
    pub fade_steps: u32,

    /// Coalescing window for progress snapshots
    #[serde(default = "default_progress_debounce_ms")]
    pub progress_debounce_ms: u64,

    /// Shape of the resume ramp
    #[serde(default, deserialize_with = "deserialize_fade_curve")]
    pub fade_curve: FadeCurve,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Presentation configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DisplayConfig {
    /// Viewports narrower than this use the compact control layout
    #[serde(default = "default_compact_breakpoint_px")]
    pub compact_breakpoint_px: u32,
}

fn default_trigger_epsilon_secs() -> f64 {
    0.5
}

fn default_countdown_secs() -> u32 {
    5
}

fn default_fade_duration_ms() -> u64 {
    1500
}

fn default_fade_steps() -> u32 {
    30
}

fn default_progress_debounce_ms() -> u64 {
    100
}

/// Accepts every spelling [`FadeCurve::from_name`] knows
fn deserialize_fade_curve<'de, D>(deserializer: D) -> std::result::Result<FadeCurve, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    FadeCurve::from_name(&name).ok_or_else(|| {
        let known: Vec<&str> = FadeCurve::ALL.iter().map(FadeCurve::config_name).collect();
        serde::de::Error::custom(format!(
            "unknown fade curve '{}', expected one of: {}",
            name,
            known.join(", ")
        ))
    })
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_compact_breakpoint_px() -> u32 {
    768
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            trigger_epsilon_secs: default_trigger_epsilon_secs(),
            countdown_secs: default_countdown_secs(),
            fade_duration_ms: default_fade_duration_ms(),
            fade_steps: default_fade_steps(),
            progress_debounce_ms: default_progress_debounce_ms(),
            fade_curve: FadeCurve::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            compact_breakpoint_px: default_compact_breakpoint_px(),
        }
    }
}

impl TimingConfig {
    /// Interval between countdown ticks
    pub fn countdown_tick(&self) -> Duration {
        Duration::from_secs(1)
    }

    /// Interval between two steps of the resume ramp
    ///
    /// 1500 ms over 30 steps gives 50 ms.
    pub fn fade_step_interval(&self) -> Duration {
        let steps = self.fade_steps.max(1) as u64;
        Duration::from_millis(self.fade_duration_ms / steps)
    }

    pub fn progress_debounce(&self) -> Duration {
        Duration::from_millis(self.progress_debounce_ms)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.trigger_epsilon_secs.is_finite() && self.trigger_epsilon_secs > 0.0) {
            return Err(Error::Config(format!(
                "trigger_epsilon_secs must be positive, got {}",
                self.trigger_epsilon_secs
            )));
        }
        if self.fade_steps == 0 && self.fade_duration_ms > 0 {
            return Err(Error::Config(
                "fade_steps must be at least 1 when fade_duration_ms is set".to_string(),
            ));
        }
        Ok(())
    }
}

impl PlayerConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(toml_content: &str) -> Result<Self> {
        let config: PlayerConfig = toml::from_str(toml_content)?;
        config.timing.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Resolve and load configuration
    ///
    /// An explicit path (CLI or environment) that cannot be read is an error;
    /// a missing platform default file falls back to built-in defaults.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_path) {
            Some(ConfigSource::Explicit(path)) => Self::load_from(&path),
            Some(ConfigSource::Platform(path)) => Self::load_from(&path),
            None => {
                warn!("No configuration file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Where a configuration file was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Named by the CLI or the environment
    Explicit(PathBuf),
    /// Found in the platform config directory
    Platform(PathBuf),
}

/// Resolve the config file path following the documented priority order
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<ConfigSource> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_path {
        return Some(ConfigSource::Explicit(path.to_path_buf()));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(ConfigSource::Explicit(PathBuf::from(path)));
        }
    }

    // Priority 3: Platform config directory
    default_config_path()
        .filter(|path| path.exists())
        .map(ConfigSource::Platform)
}

/// Platform config file location (`~/.config/ivq/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ivq").join("config.toml"))
}
