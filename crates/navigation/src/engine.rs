//! Per-frame navigation: plans a travel path, funnels the destination
//! panorama through the cache, and drives the scene graph through either a
//! flat cross-fade or an immersive double-buffer swap.

use foundation::math::{ease_in_out_sine, Vec3};
use formats::AssetLayout;
use runtime::frame::Frame;
use scene::{
    Capabilities, FloorPlacement, LayerMask, Node, SceneGraph, StereoMode, SurfaceId, WalkGraph,
};
use streaming::{Acquire, LoadPriority, LoadQueue, QueuedLoad, TextureCache, TextureKey};

use crate::path::{NAV_DURATION_MS, NAV_PUSH_M, TravelPath};

/// Which display pipeline is on screen.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RenderMode {
    Flat,
    Immersive,
}

/// Who asked for the move. Completion handling differs upstream (a tour
/// stops on user moves, a follower never re-broadcasts remote ones).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NavSource {
    User,
    Tour,
    Remote,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NavOptions {
    pub source: NavSource,
    pub duration_ms: f64,
    pub push_m: f64,
    /// Whether completion should be reported to the room.
    pub sync: bool,
}

impl Default for NavOptions {
    fn default() -> Self {
        Self {
            source: NavSource::User,
            duration_ms: NAV_DURATION_MS,
            push_m: NAV_PUSH_M,
            sync: true,
        }
    }
}

impl NavOptions {
    pub fn from_source(source: NavSource) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }
}

/// The display surfaces the engine owns: the flat main dome, its cross-fade
/// overlay, and the immersive double buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DomeRig {
    pub main: SurfaceId,
    pub overlay: SurfaceId,
    pub vr: [SurfaceId; 2],
}

/// Outcome of a navigation request. Only `Started` locks the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavStart {
    Started,
    AlreadyThere,
    /// A transition is already in flight; at most one runs at a time.
    Locked,
    UnknownNode { node_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavComplete {
    pub node_id: String,
    pub source: NavSource,
    pub sync: bool,
}

#[derive(Debug, Clone)]
struct ActiveTransition {
    node: Node,
    key: TextureKey,
    path: TravelPath,
    started_ms: f64,
    source: NavSource,
    sync: bool,
    crossfade: bool,
    overlay_prepared: bool,
}

/// Drives movement between panorama nodes.
///
/// The engine is poll-driven: `navigate_to` plans the move and requests the
/// destination texture, then `advance` is called once per frame to animate
/// the camera and finish the swap when both the travel time and the load
/// have settled.
#[derive(Debug)]
pub struct NavigationEngine {
    caps: Capabilities,
    rig: DomeRig,
    mode: RenderMode,
    stereo: StereoMode,
    /// Hardware scaling preference while flat; immersive forces 1.0.
    scaling: f64,
    experience: String,
    current_node: Option<String>,
    world_pos: Vec3,
    world_yaw: f64,
    fov: f64,
    active: Option<ActiveTransition>,
    /// Index into `rig.vr` of the dome currently on screen.
    active_vr: usize,
}

impl NavigationEngine {
    pub fn new(caps: Capabilities, rig: DomeRig, experience: impl Into<String>) -> Self {
        Self {
            caps,
            rig,
            mode: RenderMode::Flat,
            stereo: StereoMode::Mono,
            scaling: 1.0,
            experience: experience.into(),
            current_node: None,
            world_pos: Vec3::ZERO,
            world_yaw: 0.0,
            fov: 1.0,
            active: None,
            active_vr: 0,
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn is_locked(&self) -> bool {
        self.active.is_some()
    }

    pub fn current_node(&self) -> Option<&str> {
        self.current_node.as_deref()
    }

    pub fn experience(&self) -> &str {
        &self.experience
    }

    pub fn world_position(&self) -> Vec3 {
        self.world_pos
    }

    pub fn world_yaw(&self) -> f64 {
        self.world_yaw
    }

    pub fn set_stereo(&mut self, stereo: StereoMode) {
        self.stereo = stereo;
    }

    /// Moves into another experience: any in-flight transition is dropped
    /// and the position becomes undefined until the next navigation.
    pub fn set_experience(&mut self, experience: impl Into<String>) {
        self.experience = experience.into();
        self.current_node = None;
        self.active = None;
    }

    /// Look-around yaw from the user or the idle drift. Ignored while a
    /// transition owns the camera.
    pub fn apply_yaw(&mut self, yaw: f64, scene: &mut dyn SceneGraph) {
        if self.active.is_some() {
            return;
        }
        self.world_yaw = yaw;
        scene.set_world_yaw(yaw);
    }

    /// Flat-mode hardware scaling preference. Applied immediately unless
    /// immersive mode has pinned scaling to 1.0.
    pub fn set_scaling(&mut self, scale: f64, scene: &mut dyn SceneGraph) {
        self.scaling = scale;
        if self.mode == RenderMode::Flat {
            scene.set_hardware_scaling(scale);
        }
    }

    /// Plans and begins a move to `target_id`. Returns `Started` and locks
    /// the engine, or a reason why nothing happened.
    #[allow(clippy::too_many_arguments)]
    pub fn navigate_to(
        &mut self,
        graph: &WalkGraph,
        placement: &FloorPlacement,
        target_id: &str,
        opts: NavOptions,
        now_ms: f64,
        cache: &mut TextureCache,
        queue: &mut LoadQueue,
        layout: &AssetLayout,
    ) -> NavStart {
        if self.active.is_some() {
            return NavStart::Locked;
        }
        if self.current_node.as_deref() == Some(target_id) {
            return NavStart::AlreadyThere;
        }
        let Some(node) = graph.node(target_id) else {
            return NavStart::UnknownNode {
                node_id: target_id.to_string(),
            };
        };

        let to = placement.world_position(node);
        let dest_yaw = FloorPlacement::world_yaw(node);
        let immersive = self.mode == RenderMode::Immersive;
        let path = TravelPath::compute(
            self.world_pos,
            to,
            self.world_yaw,
            dest_yaw,
            self.fov,
            opts.duration_ms,
            opts.push_m,
            immersive,
        );

        let key = TextureKey::new(self.experience.clone(), node.file.clone());
        if cache.acquire(&key) == Acquire::StartLoad {
            queue.push(
                LoadPriority::Navigation,
                QueuedLoad {
                    key: key.clone(),
                    url: layout.pano_url(&node.file, self.caps),
                },
            );
        }

        self.active = Some(ActiveTransition {
            node: node.clone(),
            key,
            path,
            started_ms: now_ms,
            source: opts.source,
            sync: opts.sync,
            crossfade: !immersive && self.caps.tier.crossfade_enabled(),
            overlay_prepared: false,
        });
        NavStart::Started
    }

    /// One frame of the in-flight transition. Returns the completion record
    /// on the frame the swap lands.
    pub fn advance(
        &mut self,
        frame: Frame,
        scene: &mut dyn SceneGraph,
        cache: &mut TextureCache,
    ) -> Option<NavComplete> {
        let rig = self.rig;
        let active = self.active.as_mut()?;

        let elapsed = frame.now_ms() - active.started_ms;
        let t_raw = (elapsed / active.path.travel_ms).clamp(0.0, 1.0);
        let t_eased = ease_in_out_sine(t_raw);

        scene.set_world_position(active.path.position(t_eased));
        scene.set_world_yaw(active.path.yaw(t_eased));
        scene.set_camera_fov(active.path.fov(t_raw));

        // The overlay starts fading as soon as the texture is in and the
        // fade delay has passed; a late load simply shortens the fade.
        if active.crossfade && elapsed >= active.path.fade_delay_ms {
            if let Some(handle) = cache.handle(&active.key) {
                if !active.overlay_prepared {
                    scene.set_surface_texture(rig.overlay, handle);
                    scene.set_surface_alpha(rig.overlay, 0.0);
                    scene.set_surface_visible(rig.overlay, true);
                    active.overlay_prepared = true;
                }
                scene.set_surface_alpha(rig.overlay, active.path.fade_alpha(elapsed));
            }
        }

        if t_raw < 1.0 {
            return None;
        }

        // Travel is over. Hold at the destination while the load is still in
        // flight; a failed load aborts the move instead.
        if cache.handle(&active.key).is_none() && cache.is_loading(&active.key) {
            return None;
        }

        let finished = self.active.take()?;
        match cache.handle(&finished.key) {
            Some(handle) => {
                self.finish_swap(&finished, handle, scene);
                cache.set_current(finished.key.clone());
                self.world_pos = finished.path.p3;
                self.world_yaw = finished.path.target_yaw;
                self.current_node = Some(finished.node.id.clone());
                Some(NavComplete {
                    node_id: finished.node.id,
                    source: finished.source,
                    sync: finished.sync,
                })
            }
            None => {
                self.abort_move(&finished, scene);
                None
            }
        }
    }

    fn finish_swap(
        &mut self,
        finished: &ActiveTransition,
        handle: scene::TextureHandle,
        scene: &mut dyn SceneGraph,
    ) {
        match self.mode {
            RenderMode::Flat => {
                scene.set_surface_texture(self.rig.main, handle);
                if finished.overlay_prepared {
                    scene.set_surface_visible(self.rig.overlay, false);
                }
                scene.rebuild_hotspots(&finished.node, self.rig.main);
            }
            RenderMode::Immersive => {
                // Double buffer: the incoming dome is fully ready and shown
                // before the outgoing one is hidden, so no frame is blank.
                let incoming = self.rig.vr[self.active_vr ^ 1];
                let outgoing = self.rig.vr[self.active_vr];
                scene.set_surface_texture(incoming, handle);
                scene.set_surface_stereo(incoming, self.stereo);
                scene.set_surface_visible(incoming, true);
                scene.set_surface_visible(outgoing, false);
                self.active_vr ^= 1;
                scene.rebuild_hotspots(&finished.node, incoming);
            }
        }
    }

    /// Load failure: walk the camera back and keep the current panorama.
    fn abort_move(&mut self, finished: &ActiveTransition, scene: &mut dyn SceneGraph) {
        scene.set_world_position(finished.path.p0);
        scene.set_world_yaw(finished.path.start_yaw);
        scene.set_camera_fov(finished.path.start_fov);
        if finished.overlay_prepared {
            scene.set_surface_visible(self.rig.overlay, false);
        }
    }

    /// Switches display pipelines. Idempotent; carries the current panorama
    /// across so the user never sees an empty dome.
    pub fn set_mode(
        &mut self,
        mode: RenderMode,
        scene: &mut dyn SceneGraph,
        current_node: Option<&Node>,
        cache: &TextureCache,
    ) {
        if mode == self.mode {
            return;
        }
        self.mode = mode;
        let current_handle = cache.current().and_then(|key| cache.handle(key));

        match mode {
            RenderMode::Immersive => {
                scene.set_hardware_scaling(1.0);
                scene.set_surface_visible(self.rig.main, false);
                scene.set_surface_visible(self.rig.overlay, false);
                let dome = self.rig.vr[self.active_vr];
                if let Some(handle) = current_handle {
                    scene.set_surface_texture(dome, handle);
                }
                scene.set_surface_stereo(dome, self.stereo);
                scene.set_surface_visible(dome, true);
                scene.set_surface_visible(self.rig.vr[self.active_vr ^ 1], false);
                scene.set_camera_layers(LayerMask::IMMERSIVE);
                if let Some(node) = current_node {
                    scene.rebuild_hotspots(node, dome);
                }
            }
            RenderMode::Flat => {
                scene.set_hardware_scaling(self.scaling);
                scene.set_surface_visible(self.rig.vr[0], false);
                scene.set_surface_visible(self.rig.vr[1], false);
                if let Some(handle) = current_handle {
                    scene.set_surface_texture(self.rig.main, handle);
                }
                scene.set_surface_visible(self.rig.main, true);
                scene.set_surface_visible(self.rig.overlay, false);
                scene.set_camera_layers(LayerMask::FLAT);
                if let Some(node) = current_node {
                    scene.rebuild_hotspots(node, self.rig.main);
                }
            }
        }
    }
}
