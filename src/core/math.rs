//! Angle normalization helpers.
//!
//! Two canonical ranges are used in this crate: stored poses keep their
//! heading in [-π, π] (`normalize_angle`), while the PDR's running heading
//! accumulates in [0, 2π) (`wrap_two_pi`).

use std::f32::consts::PI;

/// Normalize angle to [-π, π].
///
/// Rebuilds the angle from its sine and cosine, so any number of
/// accumulated turns collapses to the principal value in one shot. The
/// boundary lands on either sign of π depending on rounding; both name
/// the same direction.
///
/// # Example
/// ```
/// use tire::core::math::normalize_angle;
/// use std::f32::consts::PI;
///
/// assert!((normalize_angle(5.0 * PI / 2.0) - PI / 2.0).abs() < 1e-6);
/// assert!((normalize_angle(-5.0 * PI / 2.0) + PI / 2.0).abs() < 1e-6);
/// ```
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    angle.sin().atan2(angle.cos())
}

/// Wrap angle to [0, 2π).
#[inline]
pub fn wrap_two_pi(angle: f32) -> f32 {
    let a = angle % (2.0 * PI);
    if a < 0.0 { a + 2.0 * PI } else { a }
}

/// Shortest signed angular difference from `a` to `b`.
#[inline]
pub fn angle_diff(a: f32, b: f32) -> f32 {
    normalize_angle(b - a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_angle_identity() {
        assert_relative_eq!(normalize_angle(0.0), 0.0, epsilon = 1e-6);
        assert_relative_eq!(normalize_angle(1.0), 1.0, epsilon = 1e-6);
        assert_relative_eq!(normalize_angle(-1.0), -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_normalize_angle_wraps_full_turns() {
        assert_relative_eq!(normalize_angle(2.0 * PI), 0.0, epsilon = 1e-6);
        assert_relative_eq!(normalize_angle(-2.0 * PI), 0.0, epsilon = 1e-6);
        assert_relative_eq!(normalize_angle(4.0 * PI + 0.5), 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_normalize_angle_odd_half_turns() {
        // 3π and π name the same direction; only the magnitude is pinned
        // because rounding picks the boundary's sign
        assert_relative_eq!(normalize_angle(3.0 * PI).abs(), PI, epsilon = 1e-6);
        assert_relative_eq!(normalize_angle(-3.0 * PI).abs(), PI, epsilon = 1e-6);
        assert_relative_eq!(normalize_angle(PI).abs(), PI, epsilon = 1e-6);
    }

    #[test]
    fn test_normalize_angle_stays_in_range() {
        for i in -50..=50 {
            let result = normalize_angle(i as f32 * 0.7);
            assert!(result <= PI && result >= -PI, "out of range: {}", result);
        }
    }

    #[test]
    fn test_normalize_angle_just_beyond_boundary() {
        let result = normalize_angle(PI + 0.001);
        assert!(result < 0.0, "should wrap to negative: {}", result);
        assert_relative_eq!(result, -PI + 0.001, epsilon = 1e-5);

        let result = normalize_angle(-PI - 0.001);
        assert!(result > 0.0, "should wrap to positive: {}", result);
        assert_relative_eq!(result, PI - 0.001, epsilon = 1e-5);
    }

    #[test]
    fn test_normalize_angle_many_turns() {
        let result = normalize_angle(100.0 * PI);
        assert_relative_eq!(result, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_wrap_two_pi() {
        assert_relative_eq!(wrap_two_pi(0.0), 0.0);
        assert_relative_eq!(wrap_two_pi(2.0 * PI + 0.5), 0.5, epsilon = 1e-6);
        assert_relative_eq!(wrap_two_pi(-0.5), 2.0 * PI - 0.5, epsilon = 1e-6);
        assert!(wrap_two_pi(-4.0 * PI + 0.1) >= 0.0);
    }

    #[test]
    fn test_angle_diff_crossing_pi() {
        assert_relative_eq!(angle_diff(PI - 0.1, -PI + 0.1), 0.2, epsilon = 1e-6);
        assert_relative_eq!(angle_diff(-PI + 0.1, PI - 0.1), -0.2, epsilon = 1e-6);
    }
}
