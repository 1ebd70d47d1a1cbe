use std::f64::consts::{PI, TAU};

/// Wraps an angle into `(-PI, PI]`.
pub fn wrap_angle(a: f64) -> f64 {
    let mut a = a % TAU;
    if a > PI {
        a -= TAU;
    } else if a <= -PI {
        a += TAU;
    }
    a
}

/// Signed shortest-path difference `b - a`, wrapped into `(-PI, PI]`.
pub fn angle_delta(a: f64, b: f64) -> f64 {
    wrap_angle(b - a)
}

/// Shortest-path angular interpolation.
///
/// The result never crosses more than PI of arc, regardless of how the
/// inputs are wrapped.
pub fn lerp_angle(a: f64, b: f64, t: f64) -> f64 {
    wrap_angle(a + angle_delta(a, b) * t)
}

/// Snaps an angle to a fixed step (used to de-jitter pose sampling).
pub fn quantize_angle(a: f64, step: f64) -> f64 {
    if step <= 0.0 {
        return a;
    }
    (a / step).round() * step
}

#[cfg(test)]
mod tests {
    use super::{angle_delta, lerp_angle, quantize_angle, wrap_angle};
    use std::f64::consts::PI;

    #[test]
    fn wrap_stays_in_range() {
        for a in [-10.0, -PI, -0.1, 0.0, 0.1, PI, 10.0, 100.0] {
            let w = wrap_angle(a);
            assert!(w > -PI - 1e-12 && w <= PI + 1e-12, "wrap({a}) = {w}");
        }
    }

    #[test]
    fn delta_takes_shortest_path() {
        let d = angle_delta(0.9 * PI, -0.9 * PI);
        assert!((d - 0.2 * PI).abs() < 1e-12);

        let d = angle_delta(-0.9 * PI, 0.9 * PI);
        assert!((d + 0.2 * PI).abs() < 1e-12);
    }

    #[test]
    fn lerp_never_exceeds_pi_of_travel() {
        let a = 0.95 * PI;
        let b = -0.95 * PI;
        let mid = lerp_angle(a, b, 0.5);
        // Midpoint of the short way around, not the long way through zero.
        assert!(mid.abs() > 0.9 * PI);
        assert!(angle_delta(a, mid).abs() <= PI);
    }

    #[test]
    fn lerp_endpoints_match() {
        assert!((lerp_angle(0.3, 1.1, 0.0) - 0.3).abs() < 1e-12);
        assert!((lerp_angle(0.3, 1.1, 1.0) - 1.1).abs() < 1e-12);
    }

    #[test]
    fn quantize_rounds_to_step() {
        assert_eq!(quantize_angle(0.0124, 0.005), 0.01);
        assert_eq!(quantize_angle(0.0126, 0.005), 0.015);
        assert_eq!(quantize_angle(0.7, 0.0), 0.7);
    }
}
