use foundation::math::{angle_delta, quantize_angle};
use runtime::timer::Interval;

use crate::protocol::{Pose, PoseMode};

/// How often the look direction is sampled at all.
pub const POLL_INTERVAL_MS: f64 = 100.0;
/// Angles snap to this step before the change test, to absorb sensor jitter.
pub const QUANTIZE_STEP_RAD: f64 = 0.005;
/// Minimum angular change (~0.5 degrees) that is worth a send.
pub const MIN_DELTA_RAD: f64 = 0.0087;
/// A report goes out at least this often even with no movement.
pub const KEEPALIVE_MS: f64 = 1000.0;

/// Bandwidth-bounded "send on change or heartbeat" pose sampler for the
/// viewer role.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseReporter {
    poll: Interval,
    last_sent: Option<Pose>,
    last_sent_ms: f64,
}

impl Default for PoseReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseReporter {
    pub fn new() -> Self {
        Self {
            poll: Interval::new(POLL_INTERVAL_MS),
            last_sent: None,
            last_sent_ms: f64::NEG_INFINITY,
        }
    }

    /// Offers the current look direction; returns the quantized pose to send
    /// when it differs enough from the last sent one or the keep-alive is
    /// due. Monotonic `now_ms` per reporter keeps "latest wins" meaningful
    /// at the receiver.
    pub fn sample(&mut self, now_ms: f64, yaw: f64, pitch: f64, mode: PoseMode) -> Option<Pose> {
        if !self.poll.poll(now_ms) {
            return None;
        }

        let pose = Pose {
            yaw: quantize_angle(yaw, QUANTIZE_STEP_RAD),
            pitch: quantize_angle(pitch, QUANTIZE_STEP_RAD),
            mode,
        };

        let due = match &self.last_sent {
            None => true,
            Some(prev) => {
                angle_delta(prev.yaw, pose.yaw).abs() >= MIN_DELTA_RAD
                    || angle_delta(prev.pitch, pose.pitch).abs() >= MIN_DELTA_RAD
                    || prev.mode != pose.mode
                    || now_ms - self.last_sent_ms >= KEEPALIVE_MS
            }
        };
        if !due {
            return None;
        }

        self.last_sent = Some(pose);
        self.last_sent_ms = now_ms;
        Some(pose)
    }
}
