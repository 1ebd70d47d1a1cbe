/// Per-frame allowance for texture decode and upload work.
///
/// Each panorama decoded and pushed to the renderer in a frame takes one
/// slot. Counting slots instead of wall-clock time keeps the loader's
/// scheduling deterministic under test.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameBudget {
    slots: u32,
}

impl FrameBudget {
    pub fn new(slots: u32) -> Self {
        Self { slots }
    }

    /// No practical cap; used when the caller drains the queue itself.
    pub fn unlimited() -> Self {
        Self { slots: u32::MAX }
    }

    pub fn remaining(&self) -> u32 {
        self.slots
    }

    pub fn is_exhausted(&self) -> bool {
        self.slots == 0
    }

    /// Claims one slot, or reports the frame full.
    pub fn take_slot(&mut self) -> bool {
        if self.slots == 0 {
            return false;
        }
        self.slots -= 1;
        true
    }
}
