/// Time primitives
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Time(pub f64); // seconds

impl Time {
    pub fn as_millis(self) -> f64 {
        self.0 * 1000.0
    }

    pub fn from_millis(ms: f64) -> Self {
        Self(ms / 1000.0)
    }
}
