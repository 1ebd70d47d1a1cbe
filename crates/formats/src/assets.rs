//! Panorama asset addressing: which directory and file variant a session
//! should fetch for its capabilities.

use scene::{Capabilities, DeviceTier};

/// Where an experience keeps its panoramas, relative to the experience base.
pub const PANOS_DIR: &str = "panos";
/// Reduced-size variants generated for mobile devices.
pub const MOBILE_PANOS_DIR: &str = "panos-mobile";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLayout {
    pub base: String,
    panos_dir: String,
}

impl AssetLayout {
    /// Layout for an experience base path ("experiences/skywalk"), choosing
    /// the mobile variant directory on mobile tiers.
    pub fn new(base: impl Into<String>, caps: Capabilities) -> Self {
        let panos_dir = match caps.tier {
            DeviceTier::Desktop => PANOS_DIR,
            _ => MOBILE_PANOS_DIR,
        };
        Self {
            base: base.into(),
            panos_dir: panos_dir.to_string(),
        }
    }

    /// Override the panorama directory (entry parameter).
    pub fn with_panos_dir(mut self, dir: impl Into<String>) -> Self {
        self.panos_dir = dir.into();
        self
    }

    /// File name adjusted for format support: WebP assets fall back to their
    /// JPEG siblings where WebP cannot be decoded.
    pub fn pano_file(file: &str, caps: Capabilities) -> String {
        if !caps.supports_webp {
            if let Some(stem) = file.strip_suffix(".webp") {
                return format!("{stem}.jpg");
            }
        }
        file.to_string()
    }

    pub fn pano_url(&self, file: &str, caps: Capabilities) -> String {
        let file = Self::pano_file(file, caps);
        format!("{}/{}/{}", self.base.trim_end_matches('/'), self.panos_dir, file)
    }
}

#[cfg(test)]
mod tests {
    use super::AssetLayout;
    use scene::{Capabilities, DeviceTier};

    fn caps(tier: DeviceTier, webp: bool) -> Capabilities {
        Capabilities {
            tier,
            supports_webp: webp,
            supports_xr: false,
        }
    }

    #[test]
    fn desktop_uses_full_size_directory() {
        let c = caps(DeviceTier::Desktop, true);
        let layout = AssetLayout::new("experiences/skywalk/", c);
        assert_eq!(
            layout.pano_url("a.webp", c),
            "experiences/skywalk/panos/a.webp"
        );
    }

    #[test]
    fn mobile_uses_variant_directory() {
        let c = caps(DeviceTier::Mobile, true);
        let layout = AssetLayout::new("experiences/skywalk", c);
        assert_eq!(
            layout.pano_url("a.webp", c),
            "experiences/skywalk/panos-mobile/a.webp"
        );
    }

    #[test]
    fn webp_falls_back_to_jpeg() {
        let c = caps(DeviceTier::Desktop, false);
        assert_eq!(AssetLayout::pano_file("a.webp", c), "a.jpg");
        assert_eq!(AssetLayout::pano_file("a.png", c), "a.png");
    }

    #[test]
    fn directory_override_wins() {
        let c = caps(DeviceTier::Desktop, true);
        let layout = AssetLayout::new("base", c).with_panos_dir("panos-4k");
        assert_eq!(layout.pano_url("a.webp", c), "base/panos-4k/a.webp");
    }
}
