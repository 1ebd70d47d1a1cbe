//! Experience manifest: the generated index of available tour packages.

use serde::Deserialize;

use scene::Experience;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub stereo: bool,
    /// Texture flip calibration; both default on because most capture rigs
    /// produce mirrored equirects.
    #[serde(default = "default_flip")]
    pub flip_u: bool,
    #[serde(default = "default_flip")]
    pub flip_x: bool,
}

fn default_flip() -> bool {
    true
}

fn entry_to_experience(entry: &ManifestEntry) -> Experience {
    Experience {
        id: entry.id.clone(),
        label: entry.label.clone(),
        stereo: entry.stereo,
        flip_u: entry.flip_u,
        flip_x: entry.flip_x,
    }
}

/// Parses the manifest (a JSON array of entries) into experiences, in
/// manifest order.
pub fn parse_manifest(json: &str) -> Result<Vec<Experience>, serde_json::Error> {
    let entries: Vec<ManifestEntry> = serde_json::from_str(json)?;
    Ok(entries.iter().map(entry_to_experience).collect())
}

#[cfg(test)]
mod tests {
    use super::parse_manifest;
    use pretty_assertions::assert_eq;

    #[test]
    fn flips_default_on() {
        let experiences = parse_manifest(
            r#"[
                { "id": "skywalk", "label": "Skywalk" },
                { "id": "lobby", "stereo": true, "flipU": false }
            ]"#,
        )
        .unwrap();

        assert_eq!(experiences.len(), 2);
        assert!(experiences[0].flip_u && experiences[0].flip_x);
        assert_eq!(experiences[0].label.as_deref(), Some("Skywalk"));
        assert!(experiences[1].stereo);
        assert!(!experiences[1].flip_u);
        assert!(experiences[1].flip_x);
    }
}
