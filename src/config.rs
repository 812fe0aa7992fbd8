//! TOML configuration for the concession-radar service.
//!
//! Layered model: explicit path, then the `CONCESSION_RADAR_CONFIG`
//! environment variable, then the standard system location, then
//! compiled-in defaults. Every section is optional.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const CONFIG_ENV_VAR: &str = "CONCESSION_RADAR_CONFIG";
pub const SYSTEM_CONFIG_PATH: &str = "/etc/concession-radar/config.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the service process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RadarConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RadarConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config
            .detection
            .validate()
            .with_context(|| format!("invalid [detection] section in {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve configuration. An explicit path must load; the fallbacks
    /// degrade to defaults with a warning.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        Ok(Self::load_or_default())
    }

    /// Try, in order:
    /// 1. The path in `CONCESSION_RADAR_CONFIG`.
    /// 2. `/etc/concession-radar/config.toml`.
    /// 3. Compiled-in defaults.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "CONCESSION_RADAR_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address and port for the HTTP listener.
    pub bind: String,
    /// Allow any origin (the dashboard is usually served from elsewhere).
    pub permissive_cors: bool,
    /// Upper bound on request body size, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            permissive_cors: true,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Thresholds used by the pattern, trend and time-pattern detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// A driver group is a hotspot when its rate is strictly above this.
    pub driver_rate_threshold: f64,
    /// Lower clamp for driver hotspot confidence.
    pub driver_confidence_floor: f64,
    /// A depot group spikes when its rate is strictly above this.
    pub depot_rate_threshold: f64,
    /// Added to the depot rate before severity banding.
    pub depot_severity_offset: f64,
    /// Added to the depot rate before confidence clamping.
    pub depot_confidence_offset: f64,
    /// Lower clamp for depot spike confidence.
    pub depot_confidence_floor: f64,
    /// `|change|` must exceed this for a non-stable trend.
    pub trend_change_threshold: f64,
    /// Minimum cleaned events before time patterns are considered.
    pub time_min_events: usize,
    /// Minimum exception events before time patterns are considered.
    pub time_min_exceptions: usize,
    pub weekday_share_threshold: f64,
    pub peak_hour_share_threshold: f64,
    pub weekend_difference_threshold: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            driver_rate_threshold: 0.05,
            driver_confidence_floor: 0.5,
            depot_rate_threshold: 0.08,
            depot_severity_offset: 0.02,
            depot_confidence_offset: 0.05,
            depot_confidence_floor: 0.45,
            trend_change_threshold: 0.02,
            time_min_events: 10,
            time_min_exceptions: 5,
            weekday_share_threshold: 0.25,
            peak_hour_share_threshold: 0.15,
            weekend_difference_threshold: 0.10,
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, floor) in [
            ("driver_confidence_floor", self.driver_confidence_floor),
            ("depot_confidence_floor", self.depot_confidence_floor),
        ] {
            if !(0.0..=1.0).contains(&floor) {
                bail!("{name} must be within [0, 1], got {floor}");
            }
        }
        for (name, value) in [
            ("driver_rate_threshold", self.driver_rate_threshold),
            ("depot_rate_threshold", self.depot_rate_threshold),
            ("trend_change_threshold", self.trend_change_threshold),
            ("weekday_share_threshold", self.weekday_share_threshold),
            ("peak_hour_share_threshold", self.peak_hour_share_threshold),
            ("weekend_difference_threshold", self.weekend_difference_threshold),
        ] {
            if value.is_nan() || value < 0.0 {
                bail!("{name} must be non-negative, got {value}");
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    /// `RUST_LOG` takes precedence.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl LoggingConfig {
    /// Install the global tracing subscriber. Logs go to stderr; stdout is
    /// reserved for command output.
    pub fn init(&self) {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(env_filter(&self.level))
            .with_writer(std::io::stderr);
        // Ignore an already-installed subscriber.
        let _ = match self.format {
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Pretty => builder.try_init(),
        };
    }
}

fn env_filter(default_level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
}

/// Subscriber used while the config file itself is being resolved, before
/// `[logging]` is known.
pub fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter("info"))
        .with_writer(std::io::stderr)
        .finish()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
