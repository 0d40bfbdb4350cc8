//! Pedestrian dead reckoning.
//!
//! Turns raw IMU samples into step events, step lengths, and heading
//! increments:
//!
//! - **Step detection**: low-pass filtered acceleration magnitude, armed by
//!   a threshold crossing, confirmed at the falling edge past the peak.
//!   The threshold hysteresis doubles as debounce; typical inter-step
//!   interval is ≥ 0.35 s.
//! - **Step length**: Weinberg estimate `K * (a_max - a_min)^(1/4)` with
//!   the rest magnitude approximated by gravity, clamped to human range.
//! - **Heading**: yaw rate integration, accumulated in [0, 2π).
//!
//! Output is drained once per fusion cycle; draining zeroes the
//! accumulators in the same operation.

use crate::config::PdrConfig;
use crate::core::math::wrap_two_pi;
use crate::core::types::{ImuSample, PdrUpdate};

const GRAVITY: f32 = 9.81;

/// Stride-based inertial odometry.
pub struct Pdr {
    config: PdrConfig,
    /// Sign applied to the yaw rate (IMU mounting convention).
    gyro_sign: f32,

    /// Low-pass filtered acceleration magnitude from the previous sample.
    prev_magnitude: f32,
    /// Armed by an upward threshold crossing, cleared when the peak passes.
    above_threshold: bool,

    /// Running heading, wrapped to [0, 2π). Diagnostic only; the fused
    /// heading lives in the EKF.
    heading: f32,

    // Accumulators, zeroed by drain_update
    delta_heading: f32,
    step_detected: bool,
    last_step_length: f32,
}

impl Pdr {
    pub fn new(config: PdrConfig, gyro_sign: f32) -> Self {
        Self {
            config,
            gyro_sign,
            // Start at rest: the filter history begins at gravity
            prev_magnitude: GRAVITY,
            above_threshold: false,
            heading: 0.0,
            delta_heading: 0.0,
            step_detected: false,
            last_step_length: 0.0,
        }
    }

    /// Process one IMU sample. Called every tick.
    pub fn process_imu(&mut self, sample: &ImuSample, dt: f32) {
        self.update_heading(sample.gz, dt);

        if self.detect_step(sample) {
            self.step_detected = true;
            self.last_step_length = self.estimate_step_length();
            log::debug!(
                "[pdr] Step, length {:.2} m, heading {:.2} rad",
                self.last_step_length,
                self.heading
            );
        }
    }

    /// Snapshot and zero the accumulators in one indivisible operation.
    ///
    /// Multiple steps since the last drain collapse to one event carrying
    /// the most recent length; heading deltas sum over the interval. A
    /// second drain with no samples in between returns all zeros.
    pub fn drain_update(&mut self) -> PdrUpdate {
        let update = PdrUpdate {
            step_detected: self.step_detected,
            step_length: self.last_step_length,
            delta_heading: self.delta_heading,
        };

        self.step_detected = false;
        self.last_step_length = 0.0;
        self.delta_heading = 0.0;

        update
    }

    /// Running heading in [0, 2π).
    pub fn heading(&self) -> f32 {
        self.heading
    }

    fn update_heading(&mut self, gyro_z: f32, dt: f32) {
        let delta_theta = self.gyro_sign * gyro_z * dt;
        self.delta_heading += delta_theta;
        self.heading = wrap_two_pi(self.heading + delta_theta);
    }

    fn detect_step(&mut self, sample: &ImuSample) -> bool {
        let alpha = self.config.filter_alpha;
        let magnitude =
            alpha * self.prev_magnitude + (1.0 - alpha) * sample.accel_magnitude();

        let mut step_found = false;

        if !self.above_threshold {
            // Waiting for the signal to rise above threshold
            if magnitude > self.config.step_threshold {
                self.above_threshold = true;
            }
        } else if magnitude < self.prev_magnitude {
            // The previous sample was the peak; fire on the decline
            self.above_threshold = false;
            step_found = true;
        }

        self.prev_magnitude = magnitude;
        step_found
    }

    fn estimate_step_length(&self) -> f32 {
        // The filtered peak we just passed, with gravity as the rest level
        let max_accel = self.prev_magnitude.max(GRAVITY + 0.1);
        let diff = max_accel - GRAVITY;

        let length = self.config.step_length_k * diff.powf(0.25);
        length.clamp(self.config.min_step_length, self.config.max_step_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    fn stationary_sample() -> ImuSample {
        ImuSample {
            az: GRAVITY,
            ..Default::default()
        }
    }

    fn spike_sample(az: f32) -> ImuSample {
        ImuSample {
            az,
            ..Default::default()
        }
    }

    fn new_pdr() -> Pdr {
        Pdr::new(PdrConfig::default(), 1.0)
    }

    /// Drive one synthetic stride: rise above threshold, then fall.
    fn walk_one_step(pdr: &mut Pdr) {
        for _ in 0..5 {
            pdr.process_imu(&spike_sample(16.0), 0.02);
        }
        for _ in 0..5 {
            pdr.process_imu(&stationary_sample(), 0.02);
        }
    }

    #[test]
    fn test_no_step_when_stationary() {
        let mut pdr = new_pdr();
        for _ in 0..100 {
            pdr.process_imu(&stationary_sample(), 0.02);
        }
        let update = pdr.drain_update();
        assert!(!update.step_detected);
        assert_eq!(update.step_length, 0.0);
    }

    #[test]
    fn test_step_detected_on_peak_decline() {
        let mut pdr = new_pdr();
        walk_one_step(&mut pdr);

        let update = pdr.drain_update();
        assert!(update.step_detected);
        assert!(
            update.step_length >= 0.3 && update.step_length <= 1.0,
            "length {} outside clamp",
            update.step_length
        );
    }

    #[test]
    fn test_drain_is_idempotent_once_drained() {
        let mut pdr = new_pdr();
        walk_one_step(&mut pdr);
        pdr.process_imu(&spike_sample(GRAVITY), 0.02);

        let first = pdr.drain_update();
        assert!(first.step_detected);

        let second = pdr.drain_update();
        assert!(!second.step_detected);
        assert_eq!(second.step_length, 0.0);
        assert_eq!(second.delta_heading, 0.0);
    }

    #[test]
    fn test_multiple_steps_collapse_to_one() {
        let mut pdr = new_pdr();
        walk_one_step(&mut pdr);
        walk_one_step(&mut pdr);

        let update = pdr.drain_update();
        assert!(update.step_detected);
        // One event, carrying the latest length
        assert!(update.step_length > 0.0);
    }

    #[test]
    fn test_heading_integration() {
        let mut pdr = new_pdr();
        let sample = ImuSample {
            az: GRAVITY,
            gz: FRAC_PI_2,
            ..Default::default()
        };
        // Quarter turn over one second at 50 Hz
        for _ in 0..50 {
            pdr.process_imu(&sample, 0.02);
        }

        let update = pdr.drain_update();
        assert_relative_eq!(update.delta_heading, FRAC_PI_2, epsilon = 1e-4);
        assert_relative_eq!(pdr.heading(), FRAC_PI_2, epsilon = 1e-4);
    }

    #[test]
    fn test_gyro_sign_flip() {
        let mut pdr = Pdr::new(PdrConfig::default(), -1.0);
        let sample = ImuSample {
            az: GRAVITY,
            gz: 1.0,
            ..Default::default()
        };
        pdr.process_imu(&sample, 0.5);

        let update = pdr.drain_update();
        assert_relative_eq!(update.delta_heading, -0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_internal_heading_stays_wrapped() {
        let mut pdr = new_pdr();
        let sample = ImuSample {
            az: GRAVITY,
            gz: 10.0,
            ..Default::default()
        };
        for _ in 0..1000 {
            pdr.process_imu(&sample, 0.02);
        }
        let heading = pdr.heading();
        assert!((0.0..std::f32::consts::TAU).contains(&heading));
    }

    #[test]
    fn test_no_double_count_while_above_threshold() {
        let mut pdr = new_pdr();
        // Rise and stay rising: no falling edge yet, so no step
        for az in [12.0, 14.0, 16.0, 18.0, 20.0] {
            pdr.process_imu(&spike_sample(az), 0.02);
        }
        let update = pdr.drain_update();
        assert!(!update.step_detected);
    }
}
