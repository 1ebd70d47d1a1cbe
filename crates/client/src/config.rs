//! Session configuration from entry parameters (query-string style pairs).

use scene::DeviceTier;

pub const DEFAULT_ROOM: &str = "demo";
pub const DEFAULT_XR_REFERENCE_SPACE: &str = "local-floor";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Experience to open; the first one in the manifest when unset.
    pub experience: Option<String>,
    pub room: String,
    /// Forced device tier, overriding detection.
    pub tier_override: Option<DeviceTier>,
    /// Panorama directory override (e.g. a 4k variant).
    pub panos_dir: Option<String>,
    /// Side-by-side stereo panoramas.
    pub stereo: bool,
    pub xr_reference_space: String,
    /// Primary sync endpoint; built-in fallbacks apply when unset.
    pub server: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            experience: None,
            room: DEFAULT_ROOM.to_string(),
            tier_override: None,
            panos_dir: None,
            stereo: false,
            xr_reference_space: DEFAULT_XR_REFERENCE_SPACE.to_string(),
            server: None,
        }
    }
}

impl SessionConfig {
    /// Builds a config from decoded key/value pairs. Unknown keys are
    /// ignored; empty values fall back to the defaults.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut cfg = Self::default();
        for (key, value) in pairs {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key {
                "exp" => cfg.experience = Some(value.to_string()),
                "room" => cfg.room = value.to_string(),
                "quality" => cfg.tier_override = parse_tier(value),
                "panos" => cfg.panos_dir = Some(value.to_string()),
                "stereo" => cfg.stereo = value.eq_ignore_ascii_case("half"),
                "xrspace" => cfg.xr_reference_space = value.to_string(),
                "server" => cfg.server = Some(value.to_string()),
                _ => {}
            }
        }
        cfg
    }
}

fn parse_tier(value: &str) -> Option<DeviceTier> {
    match value.to_ascii_lowercase().as_str() {
        "low" => Some(DeviceTier::ConstrainedMobile),
        "medium" => Some(DeviceTier::Mobile),
        "high" => Some(DeviceTier::Desktop),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionConfig, DEFAULT_ROOM, DEFAULT_XR_REFERENCE_SPACE};
    use pretty_assertions::assert_eq;
    use scene::DeviceTier;

    #[test]
    fn defaults_apply_when_nothing_is_given() {
        let cfg = SessionConfig::from_pairs([]);
        assert_eq!(cfg.room, DEFAULT_ROOM);
        assert_eq!(cfg.xr_reference_space, DEFAULT_XR_REFERENCE_SPACE);
        assert_eq!(cfg.experience, None);
        assert!(!cfg.stereo);
    }

    #[test]
    fn known_keys_are_parsed() {
        let cfg = SessionConfig::from_pairs([
            ("exp", "skywalk"),
            ("room", "studio-3"),
            ("quality", "low"),
            ("panos", "panos-4k"),
            ("stereo", "half"),
            ("server", "wss://sync.example.com"),
            ("bogus", "ignored"),
        ]);
        assert_eq!(cfg.experience.as_deref(), Some("skywalk"));
        assert_eq!(cfg.room, "studio-3");
        assert_eq!(cfg.tier_override, Some(DeviceTier::ConstrainedMobile));
        assert_eq!(cfg.panos_dir.as_deref(), Some("panos-4k"));
        assert!(cfg.stereo);
        assert_eq!(cfg.server.as_deref(), Some("wss://sync.example.com"));
    }

    #[test]
    fn unknown_quality_is_ignored() {
        let cfg = SessionConfig::from_pairs([("quality", "ultra"), ("stereo", "full")]);
        assert_eq!(cfg.tier_override, None);
        assert!(!cfg.stereo);
    }
}
