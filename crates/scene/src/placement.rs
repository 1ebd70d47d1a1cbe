use std::collections::BTreeMap;

use foundation::math::Vec3;

use crate::graph::{FloorId, Node, WalkGraph};

/// Storey height; floors stack vertically at this increment.
pub const FLOOR_HEIGHT_M: f64 = 3.0;
/// Fallback plan scale when a floor omits its pixels-per-metre.
pub const DEFAULT_PX_PER_METER: f64 = 100.0;

#[derive(Debug, Copy, Clone, PartialEq)]
struct FloorFrame {
    level: usize,
    cx: f64,
    cy: f64,
    ppm: f64,
}

/// Maps plan-space node coordinates to world space.
///
/// Each floor gets a local origin at the midpoint of its node extents so
/// experiences authored anywhere on a large plan stay centred on the camera.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloorPlacement {
    frames: BTreeMap<FloorId, FloorFrame>,
}

impl FloorPlacement {
    pub fn from_graph(graph: &WalkGraph) -> Self {
        // Floor order: the authored floor list, then any floor id a node
        // references that the list omits, in encounter order.
        let mut floor_order: Vec<FloorId> = graph.floors.iter().map(|f| f.id.clone()).collect();
        for node in graph.iter_ordered() {
            if !floor_order.contains(&node.floor_id) {
                floor_order.push(node.floor_id.clone());
            }
        }

        let mut frames = BTreeMap::new();
        for (level, floor_id) in floor_order.iter().enumerate() {
            let ppm = graph
                .floors
                .iter()
                .find(|f| &f.id == floor_id)
                .map(|f| f.px_per_meter)
                .filter(|p| *p > 0.0)
                .unwrap_or(DEFAULT_PX_PER_METER);

            let mut min_x = f64::INFINITY;
            let mut max_x = f64::NEG_INFINITY;
            let mut min_y = f64::INFINITY;
            let mut max_y = f64::NEG_INFINITY;
            let mut any = false;
            for node in graph.iter_ordered().filter(|n| &n.floor_id == floor_id) {
                min_x = min_x.min(node.x);
                max_x = max_x.max(node.x);
                min_y = min_y.min(node.y);
                max_y = max_y.max(node.y);
                any = true;
            }
            let (cx, cy) = if any {
                ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0)
            } else {
                (0.0, 0.0)
            };

            frames.insert(
                floor_id.clone(),
                FloorFrame { level, cx, cy, ppm },
            );
        }

        Self { frames }
    }

    /// World position of a node: plan offset from the floor centre scaled to
    /// metres, stacked vertically by floor level.
    pub fn world_position(&self, node: &Node) -> Vec3 {
        let frame = self
            .frames
            .get(&node.floor_id)
            .copied()
            .unwrap_or(FloorFrame {
                level: 0,
                cx: 0.0,
                cy: 0.0,
                ppm: DEFAULT_PX_PER_METER,
            });
        Vec3::new(
            (node.x - frame.cx) / frame.ppm,
            frame.level as f64 * FLOOR_HEIGHT_M,
            (node.y - frame.cy) / frame.ppm,
        )
    }

    /// Authored yaw is clockwise degrees; world yaw is counter-clockwise
    /// radians.
    pub fn world_yaw(node: &Node) -> f64 {
        -node.yaw_deg.to_radians()
    }
}
