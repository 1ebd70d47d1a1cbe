//! Walkthrough descriptor: the authored JSON consumed by a session.
//!
//! Authoring tools are loose about optional fields, so every field except a
//! node's image reference has a documented default. Normalization turns the
//! raw descriptor into a [`WalkGraph`] with all defaults applied.

use serde::Deserialize;

use foundation::math::Vec2;
use scene::{Floor, Hotspot, HotspotKind, Node, WalkGraph, Zone};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkthroughDescriptor {
    #[serde(default)]
    pub floors: Vec<FloorEntry>,
    #[serde(default)]
    pub nodes: Vec<NodeEntry>,
    #[serde(default)]
    pub zones: Vec<ZoneEntry>,
    #[serde(default)]
    pub start_node_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorEntry {
    pub id: String,
    #[serde(default)]
    pub pixels_per_meter: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    /// Older descriptors use `image` instead of `file`.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub floor_id: Option<String>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub yaw: f64,
    #[serde(default)]
    pub zone_id: Option<String>,
    #[serde(default)]
    pub hotspots: Vec<HotspotEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotEntry {
    #[serde(default)]
    pub to: Option<String>,
    /// Older descriptors use `target`.
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub yaw: f64,
    #[serde(default)]
    pub pitch: f64,
    /// World-calibrated angles win over the authored ones when present.
    #[serde(default)]
    pub abs_yaw: Option<f64>,
    #[serde(default)]
    pub abs_pitch: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub floor_id: Option<String>,
    #[serde(default)]
    pub rep_node_id: Option<String>,
    #[serde(default)]
    pub points: Vec<[f64; 2]>,
}

#[derive(Debug)]
pub enum DescriptorError {
    Parse(serde_json::Error),
    NoNodes,
}

impl std::fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DescriptorError::Parse(e) => write!(f, "walkthrough descriptor is not valid: {e}"),
            DescriptorError::NoNodes => write!(f, "walkthrough descriptor has no usable nodes"),
        }
    }
}

impl std::error::Error for DescriptorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DescriptorError::Parse(e) => Some(e),
            DescriptorError::NoNodes => None,
        }
    }
}

impl From<serde_json::Error> for DescriptorError {
    fn from(e: serde_json::Error) -> Self {
        DescriptorError::Parse(e)
    }
}

/// Parses a descriptor and normalizes it into a graph.
pub fn parse_walkthrough(json: &str) -> Result<WalkGraph, DescriptorError> {
    let descriptor: WalkthroughDescriptor = serde_json::from_str(json)?;
    build_graph(&descriptor)
}

/// Normalization rules:
/// - node ids default to `n{index}`; nodes without any image reference are
///   dropped;
/// - a node's floor defaults to the first declared floor, or `"f1"`;
/// - hotspot edges prefer `absYaw`/`absPitch` over `yaw`/`pitch`, and the
///   `target` spelling of `to`;
/// - zone names default to the zone id;
/// - the start node falls back to the first node.
pub fn build_graph(descriptor: &WalkthroughDescriptor) -> Result<WalkGraph, DescriptorError> {
    let default_floor = descriptor
        .floors
        .first()
        .map(|f| f.id.clone())
        .unwrap_or_else(|| "f1".to_string());

    let mut graph = WalkGraph::new();

    for floor in &descriptor.floors {
        graph.floors.push(Floor {
            id: floor.id.clone(),
            px_per_meter: floor.pixels_per_meter.unwrap_or(0.0),
        });
    }

    for zone in &descriptor.zones {
        graph.zones.push(Zone {
            id: zone.id.clone(),
            name: zone.name.clone().unwrap_or_else(|| zone.id.clone()),
            floor_id: zone.floor_id.clone().unwrap_or_else(|| default_floor.clone()),
            rep_node_id: zone.rep_node_id.clone(),
            points: zone.points.iter().map(|p| Vec2::new(p[0], p[1])).collect(),
        });
    }

    for (index, entry) in descriptor.nodes.iter().enumerate() {
        let Some(file) = entry.file.clone().or_else(|| entry.image.clone()) else {
            continue;
        };
        let id = entry.id.clone().unwrap_or_else(|| format!("n{index}"));
        let hotspots = entry
            .hotspots
            .iter()
            .filter_map(|h| {
                let to = h.to.clone().or_else(|| h.target.clone())?;
                let kind = match h.r#type.as_deref() {
                    Some("zone") => HotspotKind::Zone,
                    _ => HotspotKind::Walk,
                };
                Some(Hotspot {
                    to,
                    kind,
                    yaw_deg: h.abs_yaw.unwrap_or(h.yaw),
                    pitch_deg: h.abs_pitch.unwrap_or(h.pitch),
                })
            })
            .collect();

        graph.insert_node(Node {
            id,
            file,
            floor_id: entry.floor_id.clone().unwrap_or_else(|| default_floor.clone()),
            x: entry.x,
            y: entry.y,
            yaw_deg: entry.yaw,
            zone_id: entry.zone_id.clone(),
            hotspots,
        });
    }

    if graph.is_empty() {
        return Err(DescriptorError::NoNodes);
    }

    graph.start_node_id = descriptor
        .start_node_id
        .clone()
        .filter(|id| graph.contains(id))
        .or_else(|| graph.iter_ordered().next().map(|n| n.id.clone()));

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::{parse_walkthrough, DescriptorError};
    use pretty_assertions::assert_eq;
    use scene::HotspotKind;

    #[test]
    fn normalizes_defaults_and_aliases() {
        let graph = parse_walkthrough(
            r#"{
                "floors": [{ "id": "ground", "pixelsPerMeter": 80 }],
                "nodes": [
                    { "image": "a.webp", "x": 1, "y": 2,
                      "hotspots": [
                        { "target": "n1", "yaw": 10, "absYaw": 12.5 },
                        { "to": "lobby", "type": "zone", "pitch": -4 }
                      ] },
                    { "id": "n1", "file": "b.webp", "yaw": 90 },
                    { "x": 5, "y": 5 }
                ],
                "zones": [{ "id": "lobby", "points": [[0, 0], [10, 0]] }]
            }"#,
        )
        .unwrap();

        // The imageless third entry is dropped.
        assert_eq!(graph.len(), 2);

        let first = graph.node("n0").unwrap();
        assert_eq!(first.file, "a.webp");
        assert_eq!(first.floor_id, "ground");
        assert_eq!(first.hotspots.len(), 2);
        assert_eq!(first.hotspots[0].to, "n1");
        assert_eq!(first.hotspots[0].yaw_deg, 12.5);
        assert_eq!(first.hotspots[1].kind, HotspotKind::Zone);

        assert_eq!(graph.zones[0].name, "lobby");
        assert_eq!(graph.start_node_id.as_deref(), Some("n0"));
    }

    #[test]
    fn start_node_must_exist() {
        let graph = parse_walkthrough(
            r#"{
                "nodes": [{ "id": "a", "file": "a.webp" }],
                "startNodeId": "ghost"
            }"#,
        )
        .unwrap();
        assert_eq!(graph.start_node_id.as_deref(), Some("a"));
    }

    #[test]
    fn empty_descriptor_is_an_error() {
        let err = parse_walkthrough(r#"{ "nodes": [] }"#).unwrap_err();
        assert!(matches!(err, DescriptorError::NoNodes));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = parse_walkthrough("not json").unwrap_err();
        assert!(matches!(err, DescriptorError::Parse(_)));
    }
}
