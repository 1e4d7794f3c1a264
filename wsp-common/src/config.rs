//! Configuration loading and sync tuning
//!
//! Bootstrap configuration comes from an optional TOML file:
//!
//! ```toml
//! [relay]
//! host = "0.0.0.0"
//! port = 5780
//!
//! [sync]
//! drift_threshold_secs = 2.0
//! interaction_window_ms = 300
//! progress_interval_ms = 1000
//! default_volume = 0.3
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `WSP_CONFIG` environment variable
//! 3. Platform config locations (`~/.config/wsp/config.toml`, `/etc/wsp/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing file is never fatal: a warning is logged and defaults are used.

use crate::model::DEFAULT_VOLUME;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "WSP_CONFIG";

/// Default relay port
pub const DEFAULT_RELAY_PORT: u16 = 5780;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TomlConfig {
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Relay bind address
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RelayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Tuning of the reconciliation algorithm
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SyncSettings {
    /// Seconds-equivalent drift above which a corrective seek is issued
    #[serde(default = "default_drift_threshold")]
    pub drift_threshold_secs: f64,

    /// How long a local gesture suppresses corrective seeks
    #[serde(default = "default_interaction_window")]
    pub interaction_window_ms: u64,

    /// Progress callback cadence of the simulated media element
    #[serde(default = "default_progress_interval")]
    pub progress_interval_ms: u64,

    /// Volume restored when unmuting at zero volume
    #[serde(default = "default_volume")]
    pub default_volume: f64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            drift_threshold_secs: default_drift_threshold(),
            interaction_window_ms: default_interaction_window(),
            progress_interval_ms: default_progress_interval(),
            default_volume: default_volume(),
        }
    }
}

impl SyncSettings {
    pub fn interaction_window(&self) -> Duration {
        Duration::from_millis(self.interaction_window_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    /// Reject values that would disable or break synchronization
    pub fn validate(&self) -> Result<()> {
        if !self.drift_threshold_secs.is_finite() || self.drift_threshold_secs <= 0.0 {
            return Err(Error::Config(format!(
                "drift_threshold_secs must be positive, got {}",
                self.drift_threshold_secs
            )));
        }
        if self.interaction_window_ms == 0 {
            return Err(Error::Config("interaction_window_ms must be non-zero".to_string()));
        }
        if self.progress_interval_ms == 0 {
            return Err(Error::Config("progress_interval_ms must be non-zero".to_string()));
        }
        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err(Error::Config(format!(
                "default_volume must be within [0, 1], got {}",
                self.default_volume
            )));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level or EnvFilter directive (trace, debug, info, warn, error)
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

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_RELAY_PORT
}

fn default_drift_threshold() -> f64 {
    2.0
}

fn default_interaction_window() -> u64 {
    300
}

fn default_progress_interval() -> u64 {
    1000
}

fn default_volume() -> f64 {
    DEFAULT_VOLUME
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a config file, failing on unreadable or invalid content
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TomlConfig = toml::from_str(&content)?;
        config.sync.validate()?;
        Ok(config)
    }

    /// Resolve and load the config file, falling back to defaults when none exists
    ///
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default(cli_path: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_path) {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::load(&path)
            }
            Some(path) => {
                warn!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            None => {
                info!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Pick the config file following the resolution priority
///
/// Explicit sources (CLI, environment) are returned even if the file is
/// missing so the caller can warn about it; platform locations are only
/// returned when present.
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config locations
    platform_config_paths().into_iter().find(|p| p.exists())
}

fn platform_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("wsp").join("config.toml"));
    }
    if cfg!(unix) {
        paths.push(PathBuf::from("/etc/wsp/config.toml"));
    }
    paths
}
