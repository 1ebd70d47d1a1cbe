use foundation::math::angle_delta;
use runtime::timer::Interval;

/// Idle drift rate while autoplay is dwelling, degrees per second.
pub const AUTO_ROTATE_RATE_DPS: f64 = 0.15;
/// How often the drift target is recomputed.
pub const AUTO_ROTATE_REFRESH_MS: f64 = 1600.0;
pub const AUTO_ROTATE_MIN_REFRESH_MS: f64 = 500.0;
/// Frame deltas are clamped so a background-tab stall can't snap the view.
pub const AUTO_ROTATE_MAX_DT_MS: f64 = 100.0;

/// Slow yaw drift toward the next planned stop during tour dwell.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoRotate {
    refresh: Interval,
    target_yaw: Option<f64>,
}

impl Default for AutoRotate {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoRotate {
    pub fn new() -> Self {
        Self::with_refresh_ms(AUTO_ROTATE_REFRESH_MS)
    }

    pub fn with_refresh_ms(refresh_ms: f64) -> Self {
        Self {
            refresh: Interval::new(refresh_ms.max(AUTO_ROTATE_MIN_REFRESH_MS)),
            target_yaw: None,
        }
    }

    pub fn target(&self) -> Option<f64> {
        self.target_yaw
    }

    /// Adopts a new drift target, at most once per refresh interval.
    pub fn retarget(&mut self, now_ms: f64, target_yaw: Option<f64>) {
        if self.refresh.poll(now_ms) {
            self.target_yaw = target_yaw;
        }
    }

    /// Any lock or interactive move kills the drift immediately.
    pub fn cancel(&mut self) {
        self.target_yaw = None;
    }

    /// One frame of drift from `current_yaw`; returns the new yaw while
    /// there is still arc to cover.
    pub fn step(&mut self, current_yaw: f64, dt_ms: f64) -> Option<f64> {
        let target = self.target_yaw?;
        let delta = angle_delta(current_yaw, target);
        if delta.abs() < 1e-4 {
            return None;
        }
        let max_step = AUTO_ROTATE_RATE_DPS.to_radians() * (dt_ms.min(AUTO_ROTATE_MAX_DT_MS) / 1000.0);
        Some(current_yaw + delta.clamp(-max_step, max_step))
    }
}

#[cfg(test)]
mod tests {
    use super::{AutoRotate, AUTO_ROTATE_RATE_DPS};

    #[test]
    fn drifts_toward_target_at_fixed_rate() {
        let mut auto = AutoRotate::new();
        auto.retarget(0.0, Some(1.0));

        let stepped = auto.step(0.0, 1000.0).unwrap();
        // One second of drift, with dt clamped to 100 ms.
        let expected = AUTO_ROTATE_RATE_DPS.to_radians() * 0.1;
        assert!((stepped - expected).abs() < 1e-12);
    }

    #[test]
    fn settles_at_target() {
        let mut auto = AutoRotate::new();
        auto.retarget(0.0, Some(1e-5));
        assert!(auto.step(0.0, 16.0).is_none());
    }

    #[test]
    fn retarget_is_rate_limited() {
        let mut auto = AutoRotate::new();
        auto.retarget(0.0, Some(1.0));
        auto.retarget(100.0, Some(2.0)); // inside the refresh window
        assert_eq!(auto.target(), Some(1.0));
        auto.retarget(1700.0, Some(2.0));
        assert_eq!(auto.target(), Some(2.0));
    }

    #[test]
    fn cancel_stops_drift() {
        let mut auto = AutoRotate::new();
        auto.retarget(0.0, Some(1.0));
        auto.cancel();
        assert!(auto.step(0.0, 16.0).is_none());
    }
}
