/// Deterministic timers driven by explicit polling.
///
/// Nothing here reads a clock; callers pass the current time in milliseconds.
/// This keeps dwell timers, liveness sweeps and throttles replayable in tests.

/// One-shot countdown with pause/resume that preserves remaining time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Countdown {
    deadline_ms: Option<f64>,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, now_ms: f64, duration_ms: f64) {
        self.deadline_ms = Some(now_ms + duration_ms.max(0.0));
    }

    pub fn cancel(&mut self) {
        self.deadline_ms = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline_ms.is_some()
    }

    pub fn remaining_ms(&self, now_ms: f64) -> Option<f64> {
        self.deadline_ms.map(|d| (d - now_ms).max(0.0))
    }

    /// Cancels the countdown and reports how long it had left to run.
    pub fn pause(&mut self, now_ms: f64) -> Option<f64> {
        let remaining = self.remaining_ms(now_ms);
        self.deadline_ms = None;
        remaining
    }

    /// Fires at most once per arm: returns `true` when the deadline has
    /// passed and disarms.
    pub fn poll(&mut self, now_ms: f64) -> bool {
        match self.deadline_ms {
            Some(d) if now_ms >= d => {
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }
}

/// Repeating interval. The first poll always fires, which also makes this
/// usable as a throttle ("at most once per period").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    period_ms: f64,
    next_ms: f64,
}

impl Interval {
    pub fn new(period_ms: f64) -> Self {
        Self {
            period_ms: period_ms.max(0.0),
            next_ms: f64::NEG_INFINITY,
        }
    }

    pub fn period_ms(&self) -> f64 {
        self.period_ms
    }

    pub fn poll(&mut self, now_ms: f64) -> bool {
        if now_ms < self.next_ms {
            return false;
        }
        self.next_ms = now_ms + self.period_ms;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{Countdown, Interval};

    #[test]
    fn countdown_fires_once_at_deadline() {
        let mut c = Countdown::new();
        c.arm(1000.0, 500.0);
        assert!(!c.poll(1499.0));
        assert!(c.poll(1500.0));
        assert!(!c.poll(2000.0));
        assert!(!c.is_armed());
    }

    #[test]
    fn pause_preserves_remaining() {
        let mut c = Countdown::new();
        c.arm(0.0, 12_000.0);
        let remaining = c.pause(5_000.0).unwrap();
        assert_eq!(remaining, 7_000.0);
        assert!(!c.is_armed());

        // Re-arming with the remainder fires at the original total mark.
        c.arm(5_000.0, remaining);
        assert!(!c.poll(11_999.0));
        assert!(c.poll(12_000.0));
    }

    #[test]
    fn pause_with_zero_elapsed_keeps_full_duration() {
        let mut c = Countdown::new();
        c.arm(100.0, 800.0);
        assert_eq!(c.pause(100.0), Some(800.0));
    }

    #[test]
    fn interval_fires_immediately_then_at_period() {
        let mut i = Interval::new(800.0);
        assert!(i.poll(10.0));
        assert!(!i.poll(500.0));
        assert!(i.poll(810.0));
        assert!(!i.poll(811.0));
    }
}
