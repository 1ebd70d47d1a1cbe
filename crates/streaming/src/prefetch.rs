use std::collections::BTreeSet;

use scene::{Node, WalkGraph};

use crate::cache::TextureKey;

/// Neighbor panoramas worth warming from a node, nearest hotspots first,
/// de-duplicated, capped at `limit`.
pub fn prefetch_neighbors<'a>(graph: &'a WalkGraph, node: &'a Node, limit: usize) -> Vec<&'a Node> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for neighbor in graph.walk_neighbors(node) {
        if neighbor.id == node.id || !seen.insert(neighbor.id.clone()) {
            continue;
        }
        out.push(neighbor);
        if out.len() >= limit {
            break;
        }
    }
    out
}

/// The keep-set for an opportunistic sweep: the current node, the previous
/// key if any, and the current node's nearest neighbors.
pub fn retention_set(
    graph: &WalkGraph,
    experience: &str,
    current: &Node,
    previous: Option<&TextureKey>,
    neighbor_limit: usize,
) -> BTreeSet<TextureKey> {
    let mut keep = BTreeSet::new();
    keep.insert(TextureKey::new(experience, current.file.clone()));
    if let Some(prev) = previous {
        keep.insert(prev.clone());
    }
    for neighbor in prefetch_neighbors(graph, current, neighbor_limit) {
        keep.insert(TextureKey::new(experience, neighbor.file.clone()));
    }
    keep
}
