//! Configuration loading from TOML
//!
//! # Configuration File Format
//!
//! ```toml
//! [hardware]
//! backend = "sim"      # "sim" or "rpi" (requires --features rpi)
//! gyro_sign = 1.0      # -1.0 if the IMU is mounted yaw-inverted
//!
//! [hardware.sim]
//! seed = 42
//! step_frequency_hz = 1.8
//! max_ticks = 0        # 0 = run until Ctrl-C
//! keys = [{ tick = 50, key = "start_navigation" }]
//!
//! [maps]
//! graph_path = "data/maps/campus_map.json"
//! radio_map_path = "data/maps/campus_radio_map.json"
//!
//! [navigation]
//! default_destination = "RP_HALLWAY_END"
//! ```
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! runnable simulation setup. See `tire.toml` for a complete example.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Hardware backend selection and IMU mounting convention.
#[derive(Debug, Clone, Deserialize)]
pub struct HardwareConfig {
    /// Backend identifier.
    ///
    /// **Valid values**: "sim", "rpi" (the latter requires the `rpi` feature)
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Sign applied to the gyroscope yaw rate before integration.
    ///
    /// +1.0 for a CCW-positive mount (the documented convention), -1.0 when
    /// the IMU is mounted upside-down relative to the wearable's top face.
    #[serde(default = "default_gyro_sign")]
    pub gyro_sign: f32,

    /// Simulation parameters, used when `backend = "sim"`.
    #[serde(default)]
    pub sim: SimConfig,
}

/// A scripted keypad event for the simulated backend.
#[derive(Debug, Clone, Deserialize)]
pub struct SimKeyEvent {
    /// Tick index (at the engine rate) on which the key fires.
    pub tick: u64,
    /// Key name: "where_am_i", "start_navigation", "current_selection",
    /// or "column_N_up" / "column_N_down" for N in 1..=4.
    pub key: String,
}

/// One simulated advertiser returned by every scripted BLE scan.
#[derive(Debug, Clone, Deserialize)]
pub struct SimBeacon {
    pub id: String,
    pub rssi: i32,
}

/// Simulated hardware parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct SimConfig {
    /// RNG seed for sensor noise. 0 = non-deterministic.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Cadence of the simulated walker (steps per second).
    #[serde(default = "default_step_frequency")]
    pub step_frequency_hz: f32,

    /// Peak-to-rest amplitude of the vertical acceleration swing (m/s²).
    ///
    /// Must exceed `step_threshold - 9.81` for the step detector to fire.
    #[serde(default = "default_step_amplitude")]
    pub step_amplitude: f32,

    /// Constant yaw rate of the simulated walker (rad/s, CCW positive).
    #[serde(default)]
    pub turn_rate: f32,

    /// Gaussian noise stddev on each accelerometer channel (m/s²).
    #[serde(default = "default_accel_noise")]
    pub accel_noise_stddev: f32,

    /// Gaussian noise stddev on each gyro channel (rad/s).
    #[serde(default = "default_gyro_noise")]
    pub gyro_noise_stddev: f32,

    /// Simulated BLE scan latency in milliseconds.
    #[serde(default = "default_scan_latency")]
    pub scan_latency_ms: u64,

    /// Power off after this many ticks. 0 = run until Ctrl-C.
    #[serde(default)]
    pub max_ticks: u64,

    /// Advertisers visible to every simulated scan.
    /// Defaults to the three-beacon hallway of the sample radio map.
    #[serde(default = "default_beacons")]
    pub beacons: Vec<SimBeacon>,

    /// Scripted keypad events, consumed once each.
    #[serde(default)]
    pub keys: Vec<SimKeyEvent>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            step_frequency_hz: default_step_frequency(),
            step_amplitude: default_step_amplitude(),
            turn_rate: 0.0,
            accel_noise_stddev: default_accel_noise(),
            gyro_noise_stddev: default_gyro_noise(),
            scan_latency_ms: default_scan_latency(),
            max_ticks: 0,
            beacons: default_beacons(),
            keys: Vec::new(),
        }
    }
}

/// Map file locations.
#[derive(Debug, Clone, Deserialize)]
pub struct MapsConfig {
    /// Navigation graph JSON.
    #[serde(default = "default_graph_path")]
    pub graph_path: String,

    /// Radio map JSON. When absent, the built-in placeholder hallway map is
    /// used (with a warning) so the pipeline stays exercisable.
    #[serde(default)]
    pub radio_map_path: Option<String>,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            graph_path: default_graph_path(),
            radio_map_path: None,
        }
    }
}

/// Control loop timing.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Tick period in milliseconds (nominal 20 ms = 50 Hz).
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Seconds between periodic BLE correction scans.
    #[serde(default = "default_ble_interval")]
    pub ble_scan_interval_secs: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            ble_scan_interval_secs: default_ble_interval(),
        }
    }
}

/// Pedestrian dead reckoning tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct PdrConfig {
    /// Step detection threshold on the filtered acceleration magnitude
    /// (m/s²). Default is 1.1 g; the hardware port contract is m/s².
    #[serde(default = "default_step_threshold")]
    pub step_threshold: f32,

    /// Low-pass weight on the previous filtered magnitude.
    #[serde(default = "default_filter_alpha")]
    pub filter_alpha: f32,

    /// K constant of the Weinberg step-length estimate.
    /// Typical: 0.4 - 0.5, needs per-user calibration.
    #[serde(default = "default_step_length_k")]
    pub step_length_k: f32,

    /// Step length clamp, meters.
    #[serde(default = "default_min_step_length")]
    pub min_step_length: f32,
    #[serde(default = "default_max_step_length")]
    pub max_step_length: f32,
}

impl Default for PdrConfig {
    fn default() -> Self {
        Self {
            step_threshold: default_step_threshold(),
            filter_alpha: default_filter_alpha(),
            step_length_k: default_step_length_k(),
            min_step_length: default_min_step_length(),
            max_step_length: default_max_step_length(),
        }
    }
}

/// EKF noise tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct EkfConfig {
    /// Process noise on x and y (low = trust PDR).
    #[serde(default = "default_q_position")]
    pub q_position: f32,

    /// Process noise on heading.
    #[serde(default = "default_q_heading")]
    pub q_heading: f32,

    /// Measurement noise on BLE fixes (high = BLE is coarse).
    #[serde(default = "default_r_position")]
    pub r_position: f32,
}

impl Default for EkfConfig {
    fn default() -> Self {
        Self {
            q_position: default_q_position(),
            q_heading: default_q_heading(),
            r_position: default_r_position(),
        }
    }
}

/// BLE fingerprint localizer tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalizerConfig {
    /// Number of nearest reference points to average. Clamped up to 1.
    #[serde(default = "default_k")]
    pub k: usize,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self { k: default_k() }
    }
}

/// Guidance and routing parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct NavigationConfig {
    /// Destination selected at startup; column-4 keys cycle from here.
    #[serde(default = "default_destination")]
    pub default_destination: String,

    /// Distance at which a waypoint counts as reached, meters.
    #[serde(default = "default_waypoint_radius")]
    pub waypoint_radius: f32,

    /// Minimum seconds between spoken turn cues.
    #[serde(default = "default_cooldown")]
    pub announcement_cooldown_secs: f32,

    /// Heading error beyond which a turn cue is spoken, radians (~20°).
    #[serde(default = "default_turn_threshold")]
    pub turn_threshold: f32,

    /// Pose the EKF is initialized at.
    #[serde(default)]
    pub start_x: f32,
    #[serde(default)]
    pub start_y: f32,
    #[serde(default)]
    pub start_theta: f32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            default_destination: default_destination(),
            waypoint_radius: default_waypoint_radius(),
            announcement_cooldown_secs: default_cooldown(),
            turn_threshold: default_turn_threshold(),
            start_x: 0.0,
            start_y: 0.0,
            start_theta: 0.0,
        }
    }
}

/// Root configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub hardware: HardwareConfig,
    #[serde(default)]
    pub maps: MapsConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub pdr: PdrConfig,
    #[serde(default)]
    pub ekf: EkfConfig,
    #[serde(default)]
    pub localizer: LocalizerConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            gyro_sign: default_gyro_sign(),
            sim: SimConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Validation
    /// - `backend` must be "sim" or "rpi"
    /// - `gyro_sign` must be ±1.0
    /// - `tick_ms` must be non-zero
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML config string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = basic_toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        match self.hardware.backend.as_str() {
            "sim" | "rpi" => {}
            other => return Err(Error::UnknownBackend(other.to_string())),
        }
        if self.hardware.gyro_sign != 1.0 && self.hardware.gyro_sign != -1.0 {
            return Err(Error::Config(format!(
                "gyro_sign must be 1.0 or -1.0 (got {})",
                self.hardware.gyro_sign
            )));
        }
        if self.engine.tick_ms == 0 {
            return Err(Error::Config("tick_ms must be non-zero".to_string()));
        }
        Ok(())
    }
}

// Default value functions
fn default_backend() -> String {
    "sim".to_string()
}
fn default_gyro_sign() -> f32 {
    1.0
}
fn default_seed() -> u64 {
    42
}
fn default_step_frequency() -> f32 {
    1.8
}
fn default_step_amplitude() -> f32 {
    2.5
}
fn default_accel_noise() -> f32 {
    0.05
}
fn default_gyro_noise() -> f32 {
    0.002
}
fn default_scan_latency() -> u64 {
    1000
}
fn default_beacons() -> Vec<SimBeacon> {
    vec![
        SimBeacon {
            id: "BEACON_ID_1".to_string(),
            rssi: -55,
        },
        SimBeacon {
            id: "BEACON_ID_2".to_string(),
            rssi: -78,
        },
        SimBeacon {
            id: "BEACON_ID_3".to_string(),
            rssi: -62,
        },
    ]
}
fn default_graph_path() -> String {
    "data/maps/campus_map.json".to_string()
}
fn default_tick_ms() -> u64 {
    20
}
fn default_ble_interval() -> f32 {
    5.0
}
fn default_step_threshold() -> f32 {
    1.1 * 9.81
}
fn default_filter_alpha() -> f32 {
    0.8
}
fn default_step_length_k() -> f32 {
    0.45
}
fn default_min_step_length() -> f32 {
    0.3
}
fn default_max_step_length() -> f32 {
    1.0
}
fn default_q_position() -> f32 {
    0.1
}
fn default_q_heading() -> f32 {
    0.05
}
fn default_r_position() -> f32 {
    2.0
}
fn default_k() -> usize {
    3
}
fn default_destination() -> String {
    "RP_HALLWAY_END".to_string()
}
fn default_waypoint_radius() -> f32 {
    1.5
}
fn default_cooldown() -> f32 {
    3.0
}
fn default_turn_threshold() -> f32 {
    0.35
}
