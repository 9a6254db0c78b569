//! Server Configuration
//!
//! Everything here is read once at startup from a JSON file (plus CLI
//! overrides in the server binary); there is no hot reload.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::broadcast::DEFAULT_MAILBOX_CAPACITY;
use crate::physics::PhysicsTuning;
use crate::race::RaceMode;

/// Spectator access: one well-known id that may check in without
/// owning a car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectatorConfig {
    /// Id spectators check in with
    #[serde(default = "default_spectator_id")]
    pub car_id: String,
    /// Fixed credential; generated at startup when absent
    #[serde(default)]
    pub token: Option<String>,
}

fn default_spectator_id() -> String {
    "OBSERVER".to_string()
}

impl Default for SpectatorConfig {
    fn default() -> Self {
        Self {
            car_id: default_spectator_id(),
            token: None,
        }
    }
}

/// Server configuration stored in race.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP listen address
    pub listen_addr: String,

    /// Path to the track sample CSV
    pub track_path: PathBuf,

    /// Stable track identifier
    pub track_id: String,

    /// Track display name
    pub track_name: String,

    /// Number of cars on the grid
    pub car_count: usize,

    /// Termination rule: lap target or clock
    pub mode: RaceMode,

    /// Simulation rate in Hz
    pub tick_rate_hz: u32,

    /// Pending snapshots per subscriber before updates drop
    pub mailbox_capacity: usize,

    /// Spectator access, if allowed
    pub spectator: Option<SpectatorConfig>,

    /// Send the static roster as the first streamed message
    pub send_roster_on_subscribe: bool,

    /// Physics tuning table
    pub physics: PhysicsTuning,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:50051".to_string(),
            track_path: PathBuf::from("tracks/hockenheim.csv"),
            track_id: "hockenheim".to_string(),
            track_name: "Hockenheim Circuit".to_string(),
            car_count: 5,
            mode: RaceMode::default(),
            tick_rate_hz: 60,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            spectator: Some(SpectatorConfig::default()),
            send_roster_on_subscribe: true,
            physics: PhysicsTuning::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.car_count == 0 {
            return Err(ConfigError::InvalidValue {
                field: "car_count",
                message: "at least one car is required".to_string(),
            });
        }
        if self.tick_rate_hz == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tick_rate_hz",
                message: "tick rate must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Tick period derived from the configured rate
    pub fn tick_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.tick_rate_hz as f64)
    }
}

/// Errors loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: &'static str, message: String },
}
