//! Extended Kalman filter fusing PDR strides with BLE position fixes.
//!
//! State is `[px, py, theta]`. Strides drive the nonlinear prediction,
//! BLE fixes observe position directly. Process noise is low (PDR is
//! smooth), measurement noise is high (fingerprinting is coarse), so the
//! filter rides the strides and lets BLE slowly pull out the drift.

use crate::config::EkfConfig;
use crate::core::math::normalize_angle;
use crate::core::types::{PdrUpdate, Point2D, Pose2D};
use nalgebra::{Matrix2, Matrix2x3, Matrix3, Vector2, Vector3};

/// Pose filter over stride and fix inputs.
pub struct Ekf {
    /// State estimate [px, py, theta]
    x: Vector3<f32>,
    /// State covariance
    p: Matrix3<f32>,
    /// Process noise
    q: Matrix3<f32>,
    /// Measurement noise
    r: Matrix2<f32>,
}

impl Ekf {
    pub fn new(config: &EkfConfig) -> Self {
        Self {
            x: Vector3::zeros(),
            p: Matrix3::identity(),
            q: Matrix3::from_diagonal(&Vector3::new(
                config.q_position,
                config.q_position,
                config.q_heading,
            )),
            r: Matrix2::from_diagonal(&Vector2::new(config.r_position, config.r_position)),
        }
    }

    /// Set the state and reset covariance to identity.
    pub fn initialize(&mut self, x: f32, y: f32, theta: f32) {
        self.x = Vector3::new(x, y, normalize_angle(theta));
        self.p = Matrix3::identity();
        log::info!("[ekf] Initialized at ({:.2}, {:.2}, {:.2})", x, y, theta);
    }

    /// Apply one drained PDR update.
    ///
    /// Without a step the position is held; a significant heading change
    /// still rotates the state, but covariance is untouched so standing
    /// and turning does not inflate position uncertainty.
    pub fn predict(&mut self, update: &PdrUpdate) {
        if !update.step_detected {
            if update.delta_heading.abs() > 1e-3 {
                self.x[2] = normalize_angle(self.x[2] + update.delta_heading);
            }
            return;
        }

        let length = update.step_length;
        let d_theta = update.delta_heading;
        let theta = self.x[2];

        // Displace along the mid-stride heading
        let mid_theta = theta + d_theta / 2.0;
        self.x[0] += length * mid_theta.cos();
        self.x[1] += length * mid_theta.sin();
        self.x[2] = normalize_angle(theta + d_theta);

        // Linearize the motion model around the mid heading
        let mut f = Matrix3::identity();
        f[(0, 2)] = -length * mid_theta.sin();
        f[(1, 2)] = length * mid_theta.cos();

        self.p = f * self.p * f.transpose() + self.q;
    }

    /// Correct with a BLE position fix.
    ///
    /// A singular innovation covariance drops the measurement; the state
    /// is left untouched.
    pub fn update(&mut self, fix: Point2D) {
        let z = Vector2::new(fix.x, fix.y);

        // Observe x and y directly, never theta
        let mut h = Matrix2x3::zeros();
        h[(0, 0)] = 1.0;
        h[(1, 1)] = 1.0;

        let innovation = z - h * self.x;
        let s = h * self.p * h.transpose() + self.r;

        let s_inv = match s.try_inverse() {
            Some(inv) => inv,
            None => {
                log::warn!("[ekf] Singular innovation covariance, dropping fix");
                return;
            }
        };

        let k = self.p * h.transpose() * s_inv;

        self.x += k * innovation;
        self.x[2] = normalize_angle(self.x[2]);
        self.p = (Matrix3::identity() - k * h) * self.p;
    }

    /// Current pose estimate.
    pub fn pose(&self) -> Pose2D {
        Pose2D::new(self.x[0], self.x[1], self.x[2])
    }

    /// Current state covariance.
    pub fn covariance(&self) -> Matrix3<f32> {
        self.p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    fn step(length: f32, delta_heading: f32) -> PdrUpdate {
        PdrUpdate {
            step_detected: true,
            step_length: length,
            delta_heading,
        }
    }

    fn new_ekf() -> Ekf {
        Ekf::new(&EkfConfig::default())
    }

    #[test]
    fn test_pure_prediction_straight_line() {
        let mut ekf = new_ekf();
        ekf.initialize(0.0, 0.0, 0.0);

        for _ in 0..10 {
            ekf.predict(&step(1.0, 0.0));
        }

        let pose = ekf.pose();
        assert_relative_eq!(pose.x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(pose.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(pose.theta, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_prediction_with_heading_change() {
        let mut ekf = new_ekf();
        ekf.initialize(0.0, 0.0, 0.0);

        ekf.predict(&step(1.0, FRAC_PI_2));

        let pose = ekf.pose();
        assert_relative_eq!(pose.x, FRAC_PI_4.cos(), epsilon = 1e-6);
        assert_relative_eq!(pose.y, FRAC_PI_4.sin(), epsilon = 1e-6);
        assert_relative_eq!(pose.theta, FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn test_stationary_heading_only_update() {
        let mut ekf = new_ekf();
        ekf.initialize(1.0, 2.0, 0.0);
        let p_before = ekf.covariance();

        ekf.predict(&PdrUpdate {
            step_detected: false,
            step_length: 0.0,
            delta_heading: 0.5,
        });

        let pose = ekf.pose();
        assert_relative_eq!(pose.x, 1.0);
        assert_relative_eq!(pose.y, 2.0);
        assert_relative_eq!(pose.theta, 0.5, epsilon = 1e-6);
        // No motion model applied: covariance untouched
        assert_eq!(ekf.covariance(), p_before);
    }

    #[test]
    fn test_stationary_tiny_heading_is_noop() {
        let mut ekf = new_ekf();
        ekf.initialize(0.0, 0.0, 0.0);

        ekf.predict(&PdrUpdate {
            step_detected: false,
            step_length: 0.0,
            delta_heading: 1e-4,
        });

        assert_relative_eq!(ekf.pose().theta, 0.0);
    }

    #[test]
    fn test_update_pulls_toward_fix() {
        let mut ekf = new_ekf();
        ekf.initialize(0.0, 0.0, 0.0);

        ekf.update(Point2D::new(3.0, 0.0));

        let pose = ekf.pose();
        assert!(pose.x > 0.0 && pose.x < 3.0, "x = {}", pose.x);
        assert_relative_eq!(pose.y, 0.0, epsilon = 1e-6);
        // Heading is unobserved
        assert_relative_eq!(pose.theta, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_covariance_stays_symmetric_psd() {
        let mut ekf = new_ekf();
        ekf.initialize(0.0, 0.0, 0.0);

        for i in 0..20 {
            ekf.predict(&step(0.7, 0.1));
            if i % 5 == 0 {
                ekf.update(Point2D::new(i as f32 * 0.5, 1.0));
            }
        }

        let p = ekf.covariance();
        for row in 0..3 {
            for col in 0..3 {
                assert_relative_eq!(p[(row, col)], p[(col, row)], epsilon = 1e-4);
            }
            // Diagonal of a PSD matrix is non-negative
            assert!(p[(row, row)] >= 0.0, "P[{0},{0}] = {1}", row, p[(row, row)]);
        }
        // Uncertainty bounded: BLE fixes keep P from growing without bound
        assert!(p[(0, 0)] < 10.0);
    }

    #[test]
    fn test_singular_innovation_drops_measurement() {
        // A negative variance cancels H*P*H^T exactly: S becomes zero and
        // the inversion must fail without touching the state.
        let config = EkfConfig {
            r_position: -1.0,
            ..EkfConfig::default()
        };
        let mut ekf = Ekf::new(&config);
        ekf.initialize(1.0, 1.0, 0.5);

        ekf.update(Point2D::new(50.0, 50.0));

        let pose = ekf.pose();
        assert_relative_eq!(pose.x, 1.0);
        assert_relative_eq!(pose.y, 1.0);
        assert_relative_eq!(pose.theta, 0.5);
    }

    #[test]
    fn test_theta_wrapped_after_predict() {
        let mut ekf = new_ekf();
        ekf.initialize(0.0, 0.0, 3.0);

        ekf.predict(&step(1.0, 1.0));

        let theta = ekf.pose().theta;
        assert!(theta <= std::f32::consts::PI && theta >= -std::f32::consts::PI);
        assert_relative_eq!(theta, normalize_angle(4.0), epsilon = 1e-6);
    }
}
