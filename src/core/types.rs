//! Pose, point, and sensor sample types.

use serde::{Deserialize, Serialize};

/// A 2D point in meters, floor-plan local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    /// X coordinate in meters
    pub x: f32,
    /// Y coordinate in meters
    pub y: f32,
}

impl Point2D {
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point2D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl Default for Point2D {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

/// User pose in 2D space.
///
/// Position (x, y) in meters and heading theta in radians, normalized
/// to [-π, π].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    pub x: f32,
    pub y: f32,
    /// Heading in radians, normalized to [-π, π]
    pub theta: f32,
}

impl Pose2D {
    /// Create a new pose with theta normalized to [-π, π].
    #[inline]
    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        Self {
            x,
            y,
            theta: crate::core::math::normalize_angle(theta),
        }
    }

    #[inline]
    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

impl Default for Pose2D {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            theta: 0.0,
        }
    }
}

/// One raw IMU sample.
///
/// Accelerations are in m/s² (calibrated so 1 g ≈ 9.81), gyro rates in
/// rad/s. Backends are responsible for converting device units; the
/// positioning pipeline assumes this contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImuSample {
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
    pub gx: f32,
    pub gy: f32,
    pub gz: f32,
}

impl ImuSample {
    /// Total acceleration magnitude.
    #[inline]
    pub fn accel_magnitude(&self) -> f32 {
        (self.ax * self.ax + self.ay * self.ay + self.az * self.az).sqrt()
    }
}

/// One observed BLE advertiser in a scan.
///
/// RSSI is a negative dBm value, typically in [-100, -30].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BleReading {
    pub beacon_id: String,
    pub rssi: i32,
}

impl BleReading {
    pub fn new(beacon_id: impl Into<String>, rssi: i32) -> Self {
        Self {
            beacon_id: beacon_id.into(),
            rssi,
        }
    }
}

/// Debounced keypad event. `None` means no key this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPress {
    #[default]
    None,
    WhereAmI,
    StartNavigation,
    CurrentSelection,
    /// Up key of keypad column 1..=4
    ColumnUp(u8),
    /// Down key of keypad column 1..=4
    ColumnDown(u8),
}

/// Aggregated PDR output since the last drain.
///
/// Multiple steps between drains collapse to a single `step_detected` with
/// the most recent length; `delta_heading` sums over the interval.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PdrUpdate {
    pub step_detected: bool,
    /// Estimated length of the most recent step, meters
    pub step_length: f32,
    /// Integrated heading change since the last drain, radians
    pub delta_heading: f32,
}
