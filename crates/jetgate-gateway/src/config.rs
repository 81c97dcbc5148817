//! Gateway configuration – reads `jetgate.toml`.
//!
//! Every field has a serde default, so an absent file yields a working
//! configuration for a bench setup (rosbridge on localhost:9090).  After the
//! file parse, `JETGATE_*` environment variables override individual fields;
//! invalid numeric values are ignored rather than fatal.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use jetgate_types::GateError;

/// Static gateway configuration, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Address of the robot arm's rosbridge server.
    #[serde(default = "default_arm_address")]
    pub arm_address: String,

    /// Port the rosbridge server listens on.
    #[serde(default = "default_bridge_port")]
    pub bridge_port: u16,

    /// Port the gateway's HTTP surface listens on.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Fixed `duration` injected into every absolute-move publish.
    #[serde(default = "default_absolute_move_duration")]
    pub absolute_move_duration: f64,

    /// Speed constant for relative-move duration estimation, in
    /// millimetres per second.  Must be positive.
    #[serde(default = "default_relative_move_speed")]
    pub relative_move_speed: f64,

    /// Path to the AprilTag detection script.
    #[serde(default = "default_detect_script")]
    pub detect_script: String,
}

fn default_arm_address() -> String {
    "127.0.0.1".to_string()
}
fn default_bridge_port() -> u16 {
    9090
}
fn default_http_port() -> u16 {
    8080
}
fn default_absolute_move_duration() -> f64 {
    100.0
}
fn default_relative_move_speed() -> f64 {
    100.0
}
fn default_detect_script() -> String {
    "scripts/apriltag_center.py".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            arm_address: default_arm_address(),
            bridge_port: default_bridge_port(),
            http_port: default_http_port(),
            absolute_move_duration: default_absolute_move_duration(),
            relative_move_speed: default_relative_move_speed(),
            detect_script: default_detect_script(),
        }
    }
}

impl Config {
    /// The websocket URL of the rosbridge server.
    pub fn bridge_url(&self) -> String {
        format!("ws://{}:{}", self.arm_address, self.bridge_port)
    }

    /// Reject values the estimator cannot work with.
    pub fn validate(&self) -> Result<(), GateError> {
        if !(self.relative_move_speed > 0.0) || !self.relative_move_speed.is_finite() {
            return Err(GateError::Config(
                "relative_move_speed must be a positive number".to_string(),
            ));
        }
        if !self.absolute_move_duration.is_finite() || self.absolute_move_duration < 0.0 {
            return Err(GateError::Config(
                "absolute_move_duration must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

/// The config file path: `JETGATE_CONFIG` when set, `jetgate.toml` otherwise.
pub fn config_path() -> PathBuf {
    std::env::var("JETGATE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("jetgate.toml"))
}

/// Load the configuration from [`config_path`], falling back to defaults
/// when the file does not exist.
pub fn load() -> Result<Config, GateError> {
    load_from(&config_path())
}

/// Load the configuration from a specific path.
pub fn load_from(path: &Path) -> Result<Config, GateError> {
    let mut cfg = if path.exists() {
        let raw = fs::read_to_string(path).map_err(|e| {
            GateError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&raw)
            .map_err(|e| GateError::Config(format!("failed to parse {}: {e}", path.display())))?
    } else {
        Config::default()
    };
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

/// Apply `JETGATE_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `JETGATE_ARM_ADDRESS` | `arm_address` |
/// | `JETGATE_BRIDGE_PORT` | `bridge_port` |
/// | `JETGATE_HTTP_PORT` | `http_port` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("JETGATE_ARM_ADDRESS") {
        cfg.arm_address = v;
    }
    if let Ok(v) = std::env::var("JETGATE_BRIDGE_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.bridge_port = port;
    }
    if let Ok(v) = std::env::var("JETGATE_HTTP_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.http_port = port;
    }
}
