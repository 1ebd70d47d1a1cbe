//! Travel path between two panorama nodes: a curved forward push with a
//! blended arrival yaw and a mid-travel field-of-view dip.

use foundation::math::{cubic_bezier, lerp_angle, Vec3};

/// Default forward push distance in metres.
pub const NAV_PUSH_M: f64 = 3.0;
/// Default base duration fed into the travel-time scaling.
pub const NAV_DURATION_MS: f64 = 900.0;

/// Flat-mode travel time bounds.
pub const TRAVEL_MIN_MS: f64 = 900.0;
pub const TRAVEL_MAX_MS: f64 = 2400.0;
/// Immersive travel is stretched and bounded separately (comfort).
pub const IMMERSIVE_TRAVEL_FACTOR: f64 = 2.5;
pub const IMMERSIVE_TRAVEL_MIN_MS: f64 = 2600.0;
pub const IMMERSIVE_TRAVEL_MAX_MS: f64 = 5200.0;

/// Arrival yaw blend: this much of the destination's authored yaw mixed
/// into the direction of travel.
pub const ARRIVAL_YAW_BLEND: f64 = 0.35;

/// Mid-travel FOV dips by this much, bounded below/above.
pub const FOV_DIP: f64 = 0.12;
pub const FOV_DIP_MIN: f64 = 0.70;
pub const FOV_DIP_MAX: f64 = 1.05;

/// Cross-fade window, as a slice of the travel duration.
pub const FADE_FRACTION: f64 = 0.7;
pub const FADE_MIN_MS: f64 = 420.0;
pub const FADE_MAX_MS: f64 = 1400.0;
pub const FADE_DELAY_FRACTION: f64 = 0.25;

/// Forward unit vector implied by a world yaw.
pub fn forward_from_yaw(yaw: f64) -> Vec3 {
    Vec3::new(-yaw.sin(), 0.0, -yaw.cos())
}

/// World yaw that faces along a horizontal direction.
pub fn yaw_from_direction(dir: Vec3) -> f64 {
    (-dir.x).atan2(-dir.z)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TravelPath {
    pub p0: Vec3,
    pub c1: Vec3,
    pub c2: Vec3,
    pub p3: Vec3,
    pub start_yaw: f64,
    pub target_yaw: f64,
    pub start_fov: f64,
    pub mid_fov: f64,
    pub travel_ms: f64,
    pub fade_delay_ms: f64,
    pub fade_ms: f64,
}

impl TravelPath {
    /// Plans the move from `from` (facing `start_yaw`) to `to` (whose node
    /// was authored facing `dest_yaw`).
    pub fn compute(
        from: Vec3,
        to: Vec3,
        start_yaw: f64,
        dest_yaw: f64,
        start_fov: f64,
        duration_ms: f64,
        push_m: f64,
        immersive: bool,
    ) -> Self {
        let dist = from.horizontal_distance(to);
        let travel_dir = if dist > f64::EPSILON {
            Vec3::new(to.x - from.x, 0.0, to.z - from.z).normalized()
        } else {
            forward_from_yaw(start_yaw)
        };

        // Control magnitudes: leave along the current gaze, arrive along the
        // direction of travel, both lifted slightly so the path floats.
        let start_mag = (dist + push_m * 0.35).clamp(push_m * 0.65, push_m * 1.8);
        let end_mag = (dist * 0.6).clamp(push_m * 0.4, push_m * 1.2);
        let lift = Vec3::new(0.0, push_m * 0.15, 0.0);
        let c1 = from + forward_from_yaw(start_yaw).scale(start_mag) + lift;
        let c2 = to - travel_dir.scale(end_mag) + lift;

        let travel_yaw = yaw_from_direction(travel_dir);
        let target_yaw = lerp_angle(travel_yaw, dest_yaw, ARRIVAL_YAW_BLEND);

        // Longer hops take proportionally longer, inside hard bounds.
        let travel_factor = (dist / push_m.max(f64::EPSILON)).sqrt().clamp(0.65, 1.75);
        let flat_ms = ((duration_ms + 480.0) * travel_factor).clamp(TRAVEL_MIN_MS, TRAVEL_MAX_MS);
        let travel_ms = if immersive {
            (flat_ms * IMMERSIVE_TRAVEL_FACTOR)
                .clamp(IMMERSIVE_TRAVEL_MIN_MS, IMMERSIVE_TRAVEL_MAX_MS)
        } else {
            flat_ms
        };

        Self {
            p0: from,
            c1,
            c2,
            p3: to,
            start_yaw,
            target_yaw,
            start_fov,
            mid_fov: (start_fov - FOV_DIP).clamp(FOV_DIP_MIN, FOV_DIP_MAX),
            travel_ms,
            fade_delay_ms: travel_ms * FADE_DELAY_FRACTION,
            fade_ms: (travel_ms * FADE_FRACTION).clamp(FADE_MIN_MS, FADE_MAX_MS),
        }
    }

    /// Position along the curve for an eased progress value.
    pub fn position(&self, t_eased: f64) -> Vec3 {
        cubic_bezier(self.p0, self.c1, self.c2, self.p3, t_eased)
    }

    /// Yaw along the move: shortest-path blend from the starting gaze to
    /// the arrival yaw.
    pub fn yaw(&self, t_eased: f64) -> f64 {
        lerp_angle(self.start_yaw, self.target_yaw, t_eased)
    }

    /// FOV over raw (uneased) progress: sine dip to `mid_fov` and back.
    pub fn fov(&self, t_raw: f64) -> f64 {
        let dip = (std::f64::consts::PI * t_raw.clamp(0.0, 1.0)).sin();
        self.start_fov + (self.mid_fov - self.start_fov) * dip
    }

    /// Overlay alpha for the cross-fade at `elapsed_ms` into the travel.
    pub fn fade_alpha(&self, elapsed_ms: f64) -> f64 {
        ((elapsed_ms - self.fade_delay_ms) / self.fade_ms).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        forward_from_yaw, yaw_from_direction, TravelPath, ARRIVAL_YAW_BLEND,
        IMMERSIVE_TRAVEL_MAX_MS, IMMERSIVE_TRAVEL_MIN_MS, NAV_DURATION_MS, NAV_PUSH_M,
        TRAVEL_MAX_MS, TRAVEL_MIN_MS,
    };
    use foundation::math::{angle_delta, Vec3};
    use std::f64::consts::PI;

    fn plan(from: Vec3, to: Vec3, start_yaw: f64, dest_yaw: f64, immersive: bool) -> TravelPath {
        TravelPath::compute(
            from,
            to,
            start_yaw,
            dest_yaw,
            1.0,
            NAV_DURATION_MS,
            NAV_PUSH_M,
            immersive,
        )
    }

    #[test]
    fn yaw_direction_round_trips() {
        for yaw in [-2.0, -0.5, 0.0, 1.0, 3.0] {
            let back = yaw_from_direction(forward_from_yaw(yaw));
            assert!(angle_delta(yaw, back).abs() < 1e-12, "yaw {yaw} -> {back}");
        }
    }

    #[test]
    fn endpoints_are_exact() {
        let from = Vec3::new(0.0, 0.0, 0.0);
        let to = Vec3::new(4.0, 0.0, -3.0);
        let p = plan(from, to, 0.0, 0.0, false);
        assert_eq!(p.position(0.0), from);
        assert_eq!(p.position(1.0), to);
    }

    #[test]
    fn arrival_yaw_is_a_bounded_blend() {
        // Travelling along -z (yaw 0) toward a node authored facing 0.5.
        let p = plan(Vec3::ZERO, Vec3::new(0.0, 0.0, -5.0), 0.0, 0.5, false);
        let expected = 0.5 * ARRIVAL_YAW_BLEND;
        assert!((p.target_yaw - expected).abs() < 1e-12);

        // Wrapped case: the blend never crosses more than PI.
        let p = plan(Vec3::ZERO, Vec3::new(0.0, 0.0, -5.0), 0.0, 0.9 * PI, false);
        assert!(angle_delta(0.0, p.target_yaw).abs() <= PI);
    }

    #[test]
    fn travel_time_scales_with_distance_within_bounds() {
        let short = plan(Vec3::ZERO, Vec3::new(0.5, 0.0, 0.0), 0.0, 0.0, false);
        let long = plan(Vec3::ZERO, Vec3::new(40.0, 0.0, 0.0), 0.0, 0.0, false);
        assert!(short.travel_ms < long.travel_ms);
        assert!(short.travel_ms >= TRAVEL_MIN_MS);
        assert!(long.travel_ms <= TRAVEL_MAX_MS);
    }

    #[test]
    fn immersive_travel_is_slower_and_bounded() {
        let flat = plan(Vec3::ZERO, Vec3::new(6.0, 0.0, 0.0), 0.0, 0.0, false);
        let xr = plan(Vec3::ZERO, Vec3::new(6.0, 0.0, 0.0), 0.0, 0.0, true);
        assert!(xr.travel_ms > flat.travel_ms);
        assert!(xr.travel_ms >= IMMERSIVE_TRAVEL_MIN_MS);
        assert!(xr.travel_ms <= IMMERSIVE_TRAVEL_MAX_MS);
    }

    #[test]
    fn fov_dips_mid_travel_and_recovers() {
        let p = plan(Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0), 0.0, 0.0, false);
        assert_eq!(p.fov(0.0), 1.0);
        assert!(p.fov(0.5) < 1.0);
        assert!((p.fov(1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn fade_window_sits_inside_the_travel() {
        let p = plan(Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0), 0.0, 0.0, false);
        assert_eq!(p.fade_alpha(0.0), 0.0);
        assert_eq!(p.fade_alpha(p.fade_delay_ms + p.fade_ms), 1.0);
        let mid = p.fade_alpha(p.fade_delay_ms + p.fade_ms / 2.0);
        assert!(mid > 0.0 && mid < 1.0);
    }
}
