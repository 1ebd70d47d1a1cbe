use std::f64::consts::PI;

use crate::math::vec::Vec3;

/// Ease-in-out sine timing curve over `t` in `[0, 1]`.
pub fn ease_in_out_sine(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    -((PI * t).cos() - 1.0) / 2.0
}

/// Evaluates a cubic Bezier curve at `t` in `[0, 1]`.
pub fn cubic_bezier(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f64) -> Vec3 {
    let t = t.clamp(0.0, 1.0);
    let u = 1.0 - t;
    let uu = u * u;
    let tt = t * t;
    p0.scale(uu * u)
        + p1.scale(3.0 * uu * t)
        + p2.scale(3.0 * u * tt)
        + p3.scale(tt * t)
}

#[cfg(test)]
mod tests {
    use super::{cubic_bezier, ease_in_out_sine};
    use crate::math::vec::Vec3;

    #[test]
    fn easing_hits_endpoints() {
        assert!(ease_in_out_sine(0.0).abs() < 1e-12);
        assert!((ease_in_out_sine(1.0) - 1.0).abs() < 1e-12);
        assert!((ease_in_out_sine(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn easing_is_monotonic() {
        let mut prev = 0.0;
        for i in 1..=100 {
            let v = ease_in_out_sine(i as f64 / 100.0);
            assert!(v >= prev);
            prev = v;
        }
    }

    #[test]
    fn bezier_endpoints_are_exact() {
        let p0 = Vec3::new(0.0, 0.0, 0.0);
        let p1 = Vec3::new(1.0, 2.0, 0.0);
        let p2 = Vec3::new(2.0, 2.0, 0.0);
        let p3 = Vec3::new(3.0, 0.0, 0.0);
        assert_eq!(cubic_bezier(p0, p1, p2, p3, 0.0), p0);
        assert_eq!(cubic_bezier(p0, p1, p2, p3, 1.0), p3);
    }

    #[test]
    fn bezier_midpoint_is_pulled_toward_controls() {
        let p0 = Vec3::ZERO;
        let p3 = Vec3::new(2.0, 0.0, 0.0);
        let lifted = Vec3::new(1.0, 1.0, 0.0);
        let mid = cubic_bezier(p0, lifted, lifted, p3, 0.5);
        assert!(mid.y > 0.0);
    }
}
