//! Configuration loading and parsing

use anyhow::{bail, Context, Result};
use can_dash_core::TelemetryConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from dash.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    #[serde(default)]
    pub dbc_files: Vec<PathBuf>,
    /// candump -L log to replay
    pub replay: Option<PathBuf>,
    /// Pace the replay at logged speed
    #[serde(default)]
    pub realtime: bool,
    /// SocketCAN interface, e.g. "can0"
    pub interface: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    /// Dashboard refresh period
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Signals shown as gauges
    #[serde(default)]
    pub watch: Vec<String>,
}

fn default_interval_ms() -> u64 {
    1000
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            watch: Vec::new(),
        }
    }
}

/// Where frames come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Replay { path: PathBuf, realtime: bool },
    Interface(String),
}

impl InputConfig {
    /// Resolve the single frame source this run reads from
    pub fn source(&self) -> Result<InputSource> {
        match (&self.replay, &self.interface) {
            (Some(_), Some(_)) => bail!("Specify either a replay log or an interface, not both"),
            (Some(path), None) => Ok(InputSource::Replay {
                path: path.clone(),
                realtime: self.realtime,
            }),
            (None, Some(iface)) => Ok(InputSource::Interface(iface.clone())),
            (None, None) => bail!("No frame source: pass --replay FILE or --interface IFACE"),
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config
        .telemetry
        .validate()
        .with_context(|| format!("Invalid [telemetry] section in {:?}", path))?;

    Ok(config)
}
