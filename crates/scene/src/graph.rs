use std::collections::BTreeMap;

use foundation::math::Vec2;

pub type NodeId = String;
pub type ZoneId = String;
pub type FloorId = String;
pub type ExperienceId = String;

/// An identified tour package. Root unit of content; owns one graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Experience {
    pub id: ExperienceId,
    pub label: Option<String>,
    pub stereo: bool,
    pub flip_u: bool,
    pub flip_x: bool,
}

impl Experience {
    pub fn new(id: impl Into<ExperienceId>) -> Self {
        Self {
            id: id.into(),
            label: None,
            stereo: false,
            flip_u: true,
            flip_x: true,
        }
    }

    /// Human-readable label: the authored one, or the id with separators
    /// expanded and words title-cased ("sky-lobby" becomes "Sky Lobby").
    pub fn display_label(&self) -> String {
        if let Some(label) = &self.label {
            if !label.trim().is_empty() {
                return label.clone();
            }
        }
        self.id
            .split(['-', '_'])
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HotspotKind {
    Walk,
    Zone,
}

/// Directional marker attached to a node, pointing at another node or zone.
/// Plain id edge: never an owning reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Hotspot {
    pub to: String,
    pub kind: HotspotKind,
    pub yaw_deg: f64,
    pub pitch_deg: f64,
}

/// A panorama viewpoint; immutable once loaded; the unit of navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub file: String,
    pub floor_id: FloorId,
    pub x: f64,
    pub y: f64,
    pub yaw_deg: f64,
    pub zone_id: Option<ZoneId>,
    pub hotspots: Vec<Hotspot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Floor {
    pub id: FloorId,
    pub px_per_meter: f64,
}

/// Named polygonal grouping of nodes, used for tour pacing.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub floor_id: FloorId,
    pub rep_node_id: Option<NodeId>,
    pub points: Vec<Vec2>,
}

/// Arena of nodes indexed by id, preserving authored order for planning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalkGraph {
    nodes: BTreeMap<NodeId, Node>,
    order: Vec<NodeId>,
    pub floors: Vec<Floor>,
    pub zones: Vec<Zone>,
    pub start_node_id: Option<NodeId>,
}

impl WalkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node, keeping the authored order. Re-inserting an id
    /// replaces the node without duplicating its order slot.
    pub fn insert_node(&mut self, node: Node) {
        if !self.nodes.contains_key(&node.id) {
            self.order.push(node.id.clone());
        }
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in authored order.
    pub fn iter_ordered(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// The authored start node, falling back to the first node.
    pub fn start_node(&self) -> Option<&Node> {
        if let Some(id) = &self.start_node_id {
            if let Some(node) = self.nodes.get(id) {
                return Some(node);
            }
        }
        self.iter_ordered().next()
    }

    pub fn zone(&self, id: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }

    /// Case-insensitive lookup by zone name, exact match preferred over
    /// substring match.
    pub fn zone_by_name(&self, name: &str) -> Option<&Zone> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.zones
            .iter()
            .find(|z| z.name.to_lowercase() == needle)
            .or_else(|| {
                self.zones
                    .iter()
                    .find(|z| z.name.to_lowercase().contains(&needle))
            })
    }

    /// Nodes belonging to a zone, in authored order.
    pub fn nodes_in_zone(&self, zone_id: &str) -> Vec<&Node> {
        self.iter_ordered()
            .filter(|n| n.zone_id.as_deref() == Some(zone_id))
            .collect()
    }

    /// Nodes with no zone assignment, in authored order.
    pub fn unzoned_nodes(&self) -> Vec<&Node> {
        self.iter_ordered().filter(|n| n.zone_id.is_none()).collect()
    }

    /// The node a zone navigation lands on: the authored representative if
    /// it exists, otherwise the first node in the zone.
    pub fn representative_node(&self, zone: &Zone) -> Option<&Node> {
        if let Some(id) = &zone.rep_node_id {
            if let Some(node) = self.nodes.get(id) {
                return Some(node);
            }
        }
        self.nodes_in_zone(&zone.id).first().copied()
    }

    /// Ids of nodes reachable through this node's walk hotspots, skipping
    /// dangling edges.
    pub fn walk_neighbors<'a>(&'a self, node: &'a Node) -> Vec<&'a Node> {
        node.hotspots
            .iter()
            .filter(|h| h.kind == HotspotKind::Walk)
            .filter_map(|h| self.nodes.get(&h.to))
            .collect()
    }
}
