//! Guide-side registry of connected viewers and their mirror grid.

use std::collections::BTreeMap;

use foundation::math::lerp_angle;
use runtime::timer::Interval;
use scene::{CameraId, SceneGraph, Viewport};

use crate::protocol::{Pose, PoseMode, Uid};

/// Exponential smoothing factor applied to incoming poses.
pub const SMOOTHING: f64 = 0.3;
/// A feed with no update for this long is dead.
pub const LIVENESS_MS: f64 = 30_000.0;
/// How often dead feeds are collected.
pub const SWEEP_INTERVAL_MS: f64 = 10_000.0;
/// The mirror dome re-targets the freshest viewer at most this often.
pub const MIRROR_THROTTLE_MS: f64 = 800.0;

/// Corner panel the mirror grid occupies when it is not the primary view.
pub const MIRROR_PANEL: Viewport = Viewport {
    x: 0.78,
    y: 0.72,
    w: 0.20,
    h: 0.26,
};

/// One connected viewer as the guide sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerFeed {
    pub uid: Uid,
    pub camera: CameraId,
    pub last_seen_ms: f64,
    pub node_id: Option<String>,
    pub yaw: f64,
    pub pitch: f64,
    pub mode: PoseMode,
}

/// Tiled grid of viewer feeds with liveness sweeping and a primary swap.
///
/// The yaw/pitch sign fields are calibration hooks for capture rigs whose
/// mirrored angles come in flipped; they are applied to incoming poses
/// before smoothing. Defaults assume no flip, with the conventional pitch
/// inversion for headset-derived poses.
#[derive(Debug)]
pub struct MirrorRegistry {
    feeds: BTreeMap<Uid, ViewerFeed>,
    pub yaw_sign: f64,
    pub pitch_sign: f64,
    pub immersive_yaw_sign: f64,
    pub immersive_pitch_sign: f64,
    sweep: Interval,
    mirror_throttle: Interval,
    primary_swapped: bool,
    last_mirror_node: Option<String>,
}

impl Default for MirrorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MirrorRegistry {
    pub fn new() -> Self {
        Self {
            feeds: BTreeMap::new(),
            yaw_sign: 1.0,
            pitch_sign: 1.0,
            immersive_yaw_sign: 1.0,
            immersive_pitch_sign: -1.0,
            sweep: Interval::new(SWEEP_INTERVAL_MS),
            mirror_throttle: Interval::new(MIRROR_THROTTLE_MS),
            primary_swapped: false,
            last_mirror_node: None,
        }
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    pub fn feed(&self, uid: &str) -> Option<&ViewerFeed> {
        self.feeds.get(uid)
    }

    pub fn is_primary_swapped(&self) -> bool {
        self.primary_swapped
    }

    /// Ingests one viewer report. A first message from an unseen uid creates
    /// its feed and mirror camera; later poses are smoothed, never snapped.
    /// Returns `true` when the set of feeds changed size (layout is stale).
    pub fn apply_update(
        &mut self,
        scene: &mut dyn SceneGraph,
        uid: &str,
        node_id: Option<&str>,
        pose: Option<&Pose>,
        now_ms: f64,
    ) -> bool {
        let created = !self.feeds.contains_key(uid);
        if created {
            let camera = scene.create_mirror_camera(uid);
            self.feeds.insert(
                uid.to_string(),
                ViewerFeed {
                    uid: uid.to_string(),
                    camera,
                    last_seen_ms: now_ms,
                    node_id: None,
                    yaw: 0.0,
                    pitch: 0.0,
                    mode: PoseMode::Flat,
                },
            );
        }
        let yaw_sign = self.yaw_sign;
        let pitch_sign = self.pitch_sign;
        let immersive_yaw_sign = self.immersive_yaw_sign;
        let immersive_pitch_sign = self.immersive_pitch_sign;

        let Some(feed) = self.feeds.get_mut(uid) else {
            return created;
        };
        feed.last_seen_ms = now_ms;
        if let Some(node_id) = node_id {
            feed.node_id = Some(node_id.to_string());
        }
        if let Some(pose) = pose {
            let (mut yaw, mut pitch) = (pose.yaw * yaw_sign, pose.pitch * pitch_sign);
            if pose.mode == PoseMode::Immersive {
                yaw *= immersive_yaw_sign;
                pitch *= immersive_pitch_sign;
            }
            if created {
                feed.yaw = yaw;
                feed.pitch = pitch;
            } else {
                feed.yaw = lerp_angle(feed.yaw, yaw, SMOOTHING);
                feed.pitch = lerp_angle(feed.pitch, pitch, SMOOTHING);
            }
            feed.mode = pose.mode;
            scene.set_camera_rotation(feed.camera, feed.yaw, feed.pitch);
        }
        created
    }

    /// Collects feeds that have gone silent, disposing their cameras.
    /// Gated to run at most once per sweep interval; returns the removed
    /// uids (non-empty means the layout is stale).
    pub fn sweep(&mut self, scene: &mut dyn SceneGraph, now_ms: f64) -> Vec<Uid> {
        if !self.sweep.poll(now_ms) {
            return Vec::new();
        }
        let dead: Vec<Uid> = self
            .feeds
            .values()
            .filter(|f| now_ms - f.last_seen_ms > LIVENESS_MS)
            .map(|f| f.uid.clone())
            .collect();
        for uid in &dead {
            if let Some(feed) = self.feeds.remove(uid) {
                scene.dispose_camera(feed.camera);
            }
        }
        dead
    }

    /// Swaps which feed occupies the full-size viewport (main scene vs the
    /// mirror grid) and reapplies the layout.
    pub fn toggle_primary(&mut self, scene: &mut dyn SceneGraph) {
        self.primary_swapped = !self.primary_swapped;
        self.apply_layout(scene);
    }

    /// Recomputes and applies viewport rectangles for every live feed plus
    /// the main camera. Call whenever the registry changes size.
    pub fn apply_layout(&mut self, scene: &mut dyn SceneGraph) {
        let (grid_rect, main_rect) = if self.primary_swapped {
            (Viewport::FULL, MIRROR_PANEL)
        } else {
            (MIRROR_PANEL, Viewport::FULL)
        };
        scene.set_main_viewport(main_rect);

        let tiles = tile_layout(self.feeds.len(), grid_rect);
        for (feed, tile) in self.feeds.values().zip(tiles) {
            scene.set_camera_viewport(feed.camera, tile);
        }
    }

    /// The most recently updated feed; ties break by uid for determinism.
    pub fn freshest(&self) -> Option<&ViewerFeed> {
        self.feeds.values().max_by(|a, b| {
            a.last_seen_ms
                .partial_cmp(&b.last_seen_ms)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.uid.cmp(&a.uid))
        })
    }

    /// Which node the mirror dome should show: the freshest feed's, refreshed
    /// at a throttled rate and only reported on change.
    pub fn mirror_node(&mut self, now_ms: f64) -> Option<String> {
        if !self.mirror_throttle.poll(now_ms) {
            return None;
        }
        let node = self.freshest().and_then(|f| f.node_id.clone())?;
        if self.last_mirror_node.as_deref() == Some(node.as_str()) {
            return None;
        }
        self.last_mirror_node = Some(node.clone());
        Some(node)
    }
}

/// Grid rectangles for `n` tiles inside `rect`: `ceil(sqrt(n))` columns,
/// filled row-major from the top-left.
pub fn tile_layout(n: usize, rect: Viewport) -> Vec<Viewport> {
    if n == 0 {
        return Vec::new();
    }
    let cols = (n as f64).sqrt().ceil() as usize;
    let rows = n.div_ceil(cols);
    let w = rect.w / cols as f64;
    let h = rect.h / rows as f64;
    (0..n)
        .map(|i| {
            let col = i % cols;
            let row = i / cols;
            Viewport {
                x: rect.x + col as f64 * w,
                y: rect.y + rect.h - (row + 1) as f64 * h,
                w,
                h,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{tile_layout, MirrorRegistry, LIVENESS_MS, MIRROR_PANEL, SWEEP_INTERVAL_MS};
    use crate::protocol::{Pose, PoseMode};
    use scene::{RecordingSceneGraph, SceneOp, Viewport};

    fn pose(yaw: f64) -> Pose {
        Pose {
            yaw,
            pitch: 0.0,
            mode: PoseMode::Flat,
        }
    }

    #[test]
    fn first_update_creates_feed_and_snaps_pose() {
        let mut scene = RecordingSceneGraph::new();
        let mut reg = MirrorRegistry::new();

        let changed = reg.apply_update(&mut scene, "u1", Some("n1"), Some(&pose(0.4)), 0.0);
        assert!(changed);
        let feed = reg.feed("u1").unwrap();
        assert_eq!(feed.yaw, 0.4);
        assert_eq!(feed.node_id.as_deref(), Some("n1"));
    }

    #[test]
    fn later_updates_are_smoothed_not_snapped() {
        let mut scene = RecordingSceneGraph::new();
        let mut reg = MirrorRegistry::new();
        reg.apply_update(&mut scene, "u1", None, Some(&pose(0.0)), 0.0);
        reg.apply_update(&mut scene, "u1", None, Some(&pose(1.0)), 100.0);

        let feed = reg.feed("u1").unwrap();
        assert!((feed.yaw - 0.3).abs() < 1e-12);
    }

    #[test]
    fn node_id_only_changes_via_explicit_message() {
        let mut scene = RecordingSceneGraph::new();
        let mut reg = MirrorRegistry::new();
        reg.apply_update(&mut scene, "u1", Some("n1"), None, 0.0);
        reg.apply_update(&mut scene, "u1", None, Some(&pose(0.2)), 100.0);
        assert_eq!(reg.feed("u1").unwrap().node_id.as_deref(), Some("n1"));
    }

    #[test]
    fn sweep_removes_silent_feeds_and_disposes_cameras() {
        let mut scene = RecordingSceneGraph::new();
        let mut reg = MirrorRegistry::new();
        reg.apply_update(&mut scene, "u1", None, None, 0.0);
        reg.apply_update(&mut scene, "u2", None, None, LIVENESS_MS);

        // First poll arms the interval; advance past liveness for u1 only.
        reg.sweep(&mut scene, 0.0);
        let removed = reg.sweep(&mut scene, LIVENESS_MS + SWEEP_INTERVAL_MS);
        assert_eq!(removed, vec!["u1".to_string()]);
        assert!(reg.feed("u1").is_none());
        assert!(reg.feed("u2").is_some());
        assert!(scene
            .ops()
            .iter()
            .any(|op| matches!(op, SceneOp::DisposeCamera(_))));
    }

    #[test]
    fn freshest_prefers_latest_update() {
        let mut scene = RecordingSceneGraph::new();
        let mut reg = MirrorRegistry::new();
        reg.apply_update(&mut scene, "u1", Some("n1"), None, 0.0);
        reg.apply_update(&mut scene, "u2", Some("n2"), None, 500.0);
        assert_eq!(reg.freshest().unwrap().uid, "u2");
    }

    #[test]
    fn mirror_node_is_throttled_and_deduped() {
        let mut scene = RecordingSceneGraph::new();
        let mut reg = MirrorRegistry::new();
        reg.apply_update(&mut scene, "u1", Some("n1"), None, 0.0);

        assert_eq!(reg.mirror_node(0.0), Some("n1".to_string()));
        // Inside the throttle window, and unchanged afterwards.
        assert_eq!(reg.mirror_node(100.0), None);
        assert_eq!(reg.mirror_node(900.0), None);

        reg.apply_update(&mut scene, "u1", Some("n2"), None, 1000.0);
        assert_eq!(reg.mirror_node(1800.0), Some("n2".to_string()));
    }

    #[test]
    fn layout_tiles_fill_the_panel() {
        let tiles = tile_layout(3, MIRROR_PANEL);
        assert_eq!(tiles.len(), 3);
        // 3 feeds: 2 columns, 2 rows.
        assert_eq!(tiles[0].w, MIRROR_PANEL.w / 2.0);
        assert_eq!(tiles[0].h, MIRROR_PANEL.h / 2.0);
        // Top row sits above the bottom row.
        assert!(tiles[0].y > tiles[2].y);
    }

    #[test]
    fn primary_swap_exchanges_full_and_panel() {
        let mut scene = RecordingSceneGraph::new();
        let mut reg = MirrorRegistry::new();
        reg.apply_update(&mut scene, "u1", None, None, 0.0);

        reg.toggle_primary(&mut scene);
        let main = scene.ops().iter().rev().find_map(|op| match op {
            SceneOp::MainViewport(v) => Some(*v),
            _ => None,
        });
        assert_eq!(main, Some(MIRROR_PANEL));

        reg.toggle_primary(&mut scene);
        let main = scene.ops().iter().rev().find_map(|op| match op {
            SceneOp::MainViewport(v) => Some(*v),
            _ => None,
        });
        assert_eq!(main, Some(Viewport::FULL));
    }
}
