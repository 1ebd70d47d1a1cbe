/// Coarse device classification used for cache sizing and effect gating.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeviceTier {
    /// Memory-constrained mobile GPUs (small texture pools, no cross-fade).
    ConstrainedMobile,
    Mobile,
    Desktop,
}

impl DeviceTier {
    /// Texture pool size for a driving (guide) session.
    pub fn texture_limit(self) -> usize {
        match self {
            DeviceTier::ConstrainedMobile => 6,
            DeviceTier::Mobile => 10,
            DeviceTier::Desktop => 16,
        }
    }

    /// Texture pool size for a following (viewer) session, which never
    /// prefetches far ahead and can run tighter.
    pub fn follower_texture_limit(self) -> usize {
        match self {
            DeviceTier::ConstrainedMobile => 2,
            DeviceTier::Mobile => 8,
            DeviceTier::Desktop => 16,
        }
    }

    /// How many neighbor panoramas to warm ahead of navigation.
    pub fn prefetch_limit(self) -> usize {
        match self {
            DeviceTier::ConstrainedMobile => 1,
            _ => 2,
        }
    }

    /// Flat-mode cross-fade is disabled where the extra full-size overlay
    /// texture has caused device resets.
    pub fn crossfade_enabled(self) -> bool {
        self != DeviceTier::ConstrainedMobile
    }
}

/// Capability descriptor resolved once at session start and passed down;
/// nothing in the core probes the platform ad hoc.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub tier: DeviceTier,
    pub supports_webp: bool,
    pub supports_xr: bool,
}

impl Capabilities {
    pub fn desktop() -> Self {
        Self {
            tier: DeviceTier::Desktop,
            supports_webp: true,
            supports_xr: false,
        }
    }
}
