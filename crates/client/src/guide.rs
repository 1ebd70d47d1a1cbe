//! The guide (driver) session: owns the itinerary, broadcasts landings to
//! the room, and mirrors connected viewers in a corner grid.

use foundation::math::Vec3;
use navigation::{
    yaw_from_direction, AutoRotate, DomeRig, NavComplete, NavOptions, NavSource, NavStart,
    NavigationEngine, AUTO_ROTATE_MAX_DT_MS,
};
use runtime::budget::FrameBudget;
use runtime::frame::Frame;
use runtime::timer::Interval;
use scene::{Capabilities, FloorPlacement, SceneGraph, SurfaceId, TextureHandle, WalkGraph};
use streaming::{
    prefetch_neighbors, retention_set, Acquire, CacheHint, HintSink, LoadPriority, LoadQueue,
    QueuedLoad, TextureCache, TextureKey,
};
use sync::{MirrorRegistry, ReconnectSchedule, Role, RoomId, SyncMessage};
use tour::{ExperienceSource, TourCommand, TourEvent, TourOutput, TourScheduler};

use crate::config::SessionConfig;
use formats::AssetLayout;

/// How often far-away textures are swept out against the retention set.
pub const RETENTION_SWEEP_MS: f64 = 45_000.0;

/// What one frame of the session produced, beyond scene-graph calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub completed: Option<NavComplete>,
    /// Node the mirror dome switched to this tick, for UI labeling; the
    /// texture itself is fetched and applied by the session.
    pub mirror_node: Option<String>,
}

pub struct GuideSession {
    caps: Capabilities,
    room: RoomId,
    content_root: String,
    panos_dir_override: Option<String>,
    graph: WalkGraph,
    placement: FloorPlacement,
    layout: AssetLayout,
    engine: NavigationEngine,
    cache: TextureCache,
    queue: LoadQueue,
    registry: MirrorRegistry,
    mirror_surface: SurfaceId,
    /// Texture on (or inbound to) the mirror dome, shielded from sweeps.
    mirror_key: Option<TextureKey>,
    mirror_pending: Option<TextureKey>,
    tour: TourScheduler,
    autorotate: AutoRotate,
    source: Box<dyn ExperienceSource>,
    reconnect: ReconnectSchedule,
    retention_sweep: Interval,
    outbound: Vec<SyncMessage>,
    events: Vec<TourEvent>,
}

impl GuideSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        caps: Capabilities,
        rig: DomeRig,
        mirror_surface: SurfaceId,
        config: &SessionConfig,
        experience_id: &str,
        content_root: &str,
        graph: WalkGraph,
        source: Box<dyn ExperienceSource>,
        reconnect: ReconnectSchedule,
    ) -> Self {
        let placement = FloorPlacement::from_graph(&graph);
        let layout = make_layout(content_root, experience_id, caps, config.panos_dir.as_deref());
        Self {
            caps,
            room: config.room.clone(),
            content_root: content_root.trim_end_matches('/').to_string(),
            panos_dir_override: config.panos_dir.clone(),
            graph,
            placement,
            layout,
            engine: NavigationEngine::new(caps, rig, experience_id),
            cache: TextureCache::new(caps.tier.texture_limit()),
            queue: LoadQueue::new(),
            registry: MirrorRegistry::new(),
            mirror_surface,
            mirror_key: None,
            mirror_pending: None,
            tour: TourScheduler::new(),
            autorotate: AutoRotate::new(),
            source,
            reconnect,
            retention_sweep: Interval::new(RETENTION_SWEEP_MS),
            outbound: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn engine(&self) -> &NavigationEngine {
        &self.engine
    }

    pub fn tour(&self) -> &TourScheduler {
        &self.tour
    }

    pub fn registry(&self) -> &MirrorRegistry {
        &self.registry
    }

    /// Messages waiting to go out over the room transport.
    pub fn drain_outbound(&mut self) -> Vec<SyncMessage> {
        std::mem::take(&mut self.outbound)
    }

    /// Tour state changes waiting to be surfaced in the UI.
    pub fn drain_events(&mut self) -> Vec<TourEvent> {
        std::mem::take(&mut self.events)
    }

    fn exp_path(&self) -> String {
        format!("{}/{}", self.content_root, self.engine.experience())
    }

    /// One frame: advances the transition, paces the tour, drifts the idle
    /// camera, and does housekeeping sweeps.
    pub fn tick(
        &mut self,
        frame: Frame,
        scene: &mut dyn SceneGraph,
        hints: &mut dyn HintSink,
    ) -> TickReport {
        let now_ms = frame.now_ms();
        let mut report = TickReport::default();

        if let Some(done) = self.engine.advance(frame, scene, &mut self.cache) {
            self.warm_neighbors(&done.node_id, hints);
            let out =
                self.tour
                    .on_navigation(now_ms, &done.node_id, done.source == NavSource::User);
            self.apply_output(out, scene, now_ms);
            if done.sync {
                self.outbound.push(SyncMessage::guide_sync(
                    self.room.clone(),
                    done.node_id.clone(),
                    self.engine.experience().to_string(),
                    self.exp_path(),
                    self.engine.world_position(),
                ));
            }
            report.completed = Some(done);
        }

        let out = self.tour.poll(now_ms);
        self.apply_output(out, scene, now_ms);

        if self.tour.is_playing() && !self.engine.is_locked() {
            let aim = self.upcoming_yaw();
            self.autorotate.retarget(now_ms, aim);
            let dt = frame.dt_ms_clamped(AUTO_ROTATE_MAX_DT_MS);
            if let Some(yaw) = self.autorotate.step(self.engine.world_yaw(), dt) {
                self.engine.apply_yaw(yaw, scene);
            }
        } else {
            self.autorotate.cancel();
        }

        if self.retention_sweep.poll(now_ms) {
            self.sweep_retained(scene, hints);
        }

        if !self.registry.sweep(scene, now_ms).is_empty() {
            self.registry.apply_layout(scene);
        }
        if let Some(node_id) = self.registry.mirror_node(now_ms) {
            self.show_mirror(&node_id, scene);
            report.mirror_node = Some(node_id);
        }
        report
    }

    /// Points the mirror dome at `node_id`'s panorama, fetching it through
    /// the same cache and queue the main path uses.
    fn show_mirror(&mut self, node_id: &str, scene: &mut dyn SceneGraph) {
        let Some(node) = self.graph.node(node_id) else {
            return;
        };
        let key = TextureKey::new(self.engine.experience(), node.file.clone());
        match self.cache.acquire(&key) {
            Acquire::Resident(handle) => {
                scene.set_surface_texture(self.mirror_surface, handle);
                self.mirror_pending = None;
                self.mirror_key = Some(key);
            }
            Acquire::StartLoad => {
                let url = self.layout.pano_url(&node.file, self.caps);
                self.queue
                    .push(LoadPriority::Prefetch, QueuedLoad { key: key.clone(), url });
                self.mirror_pending = Some(key);
            }
            Acquire::Loading => self.mirror_pending = Some(key),
        }
    }

    /// User-initiated navigation. Ends autoplay the moment it actually
    /// starts a move.
    pub fn navigate(&mut self, target_id: &str, now_ms: f64) -> NavStart {
        let started = self.engine.navigate_to(
            &self.graph,
            &self.placement,
            target_id,
            NavOptions::from_source(NavSource::User),
            now_ms,
            &mut self.cache,
            &mut self.queue,
            &self.layout,
        );
        if started == NavStart::Started && self.tour.is_playing() {
            let stopped = self.tour.stop();
            self.events.extend(stopped.events);
            self.autorotate.cancel();
        }
        started
    }

    pub fn start_tour(&mut self, scene: &mut dyn SceneGraph, now_ms: f64) {
        let out = self.tour.start_auto(now_ms, self.source.as_mut());
        self.apply_output(out, scene, now_ms);
    }

    pub fn pause_tour(&mut self, now_ms: f64) {
        let out = self.tour.pause(now_ms);
        self.events.extend(out.events);
    }

    pub fn resume_tour(&mut self, now_ms: f64) {
        let out = self.tour.resume(now_ms);
        self.events.extend(out.events);
    }

    pub fn stop_tour(&mut self) {
        let out = self.tour.stop();
        self.events.extend(out.events);
        self.autorotate.cancel();
    }

    pub fn next_stop(&mut self, scene: &mut dyn SceneGraph, now_ms: f64) {
        let out = self.tour.next(now_ms);
        self.apply_output(out, scene, now_ms);
    }

    pub fn prev_stop(&mut self, scene: &mut dyn SceneGraph, now_ms: f64) {
        let out = self.tour.prev(now_ms);
        self.apply_output(out, scene, now_ms);
    }

    /// Routes an inbound room message. Only viewer reports matter to the
    /// guide; everything else is relay chatter.
    pub fn handle_message(
        &mut self,
        msg: &SyncMessage,
        scene: &mut dyn SceneGraph,
        now_ms: f64,
    ) {
        if !msg.is_viewer_report() {
            return;
        }
        let SyncMessage::Sync {
            uid: Some(uid),
            node_id,
            pose,
            ..
        } = msg
        else {
            return;
        };
        let changed = self
            .registry
            .apply_update(scene, uid, node_id.as_deref(), pose.as_ref(), now_ms);
        if changed {
            self.registry.apply_layout(scene);
        }
    }

    pub fn toggle_mirror_primary(&mut self, scene: &mut dyn SceneGraph) {
        self.registry.toggle_primary(scene);
    }

    /// Next panorama fetch the embedder should perform, within this frame's
    /// budget.
    pub fn next_load(&mut self, budget: &mut FrameBudget) -> Option<QueuedLoad> {
        self.queue.pop_next_with_budget(budget)
    }

    pub fn load_finished(
        &mut self,
        key: &TextureKey,
        handle: TextureHandle,
        scene: &mut dyn SceneGraph,
    ) {
        match self.cache.complete(key, handle) {
            Ok(done) => {
                for (_, evicted) in done.evicted {
                    scene.dispose_texture(evicted);
                }
                if self.mirror_pending.as_ref() == Some(key) {
                    scene.set_surface_texture(self.mirror_surface, handle);
                    self.mirror_key = self.mirror_pending.take();
                }
            }
            // Stale arrival after a purge: the handle is ours to dispose.
            Err(_) => scene.dispose_texture(handle),
        }
    }

    pub fn load_failed(&mut self, key: &TextureKey) {
        let _ = self.cache.fail(key);
        if self.mirror_pending.as_ref() == Some(key) {
            self.mirror_pending = None;
        }
    }

    /// Drops every GPU texture (tab hidden, rendering context lost).
    pub fn release_textures(&mut self, scene: &mut dyn SceneGraph) {
        for (_, handle) in self.cache.purge_all() {
            scene.dispose_texture(handle);
        }
        self.queue = LoadQueue::new();
        self.mirror_key = None;
        self.mirror_pending = None;
    }

    /// Replays the current node after `release_textures`, repainting the
    /// dome through a normal transition.
    pub fn restore(&mut self, now_ms: f64) -> NavStart {
        let Some(node_id) = self.engine.current_node().map(str::to_string) else {
            return NavStart::AlreadyThere;
        };
        let experience = self.engine.experience().to_string();
        self.engine.set_experience(experience);
        self.engine.navigate_to(
            &self.graph,
            &self.placement,
            &node_id,
            NavOptions {
                source: NavSource::Remote,
                sync: false,
                ..NavOptions::default()
            },
            now_ms,
            &mut self.cache,
            &mut self.queue,
            &self.layout,
        )
    }

    pub fn dial_endpoint(&self) -> Option<&str> {
        self.reconnect.current()
    }

    pub fn on_connected(&mut self) {
        self.reconnect.on_open();
        self.outbound.push(SyncMessage::Join {
            room: self.room.clone(),
            role: Role::Guide,
            uid: None,
        });
    }

    /// Returns how long to wait before redialing.
    pub fn on_disconnected(&mut self) -> f64 {
        self.reconnect.on_failure()
    }

    /// Swaps in another experience's content. Returns false when the source
    /// no longer has it.
    pub fn switch_experience(&mut self, id: &str, scene: &mut dyn SceneGraph) -> bool {
        let Some(graph) = self.source.graph(id) else {
            return false;
        };
        for (_, handle) in self.cache.purge_all() {
            scene.dispose_texture(handle);
        }
        self.queue = LoadQueue::new();
        self.mirror_key = None;
        self.mirror_pending = None;
        scene.clear_hotspots();
        self.placement = FloorPlacement::from_graph(&graph);
        self.graph = graph;
        self.layout = make_layout(
            &self.content_root,
            id,
            self.caps,
            self.panos_dir_override.as_deref(),
        );
        self.engine.set_experience(id);
        true
    }

    fn apply_output(&mut self, out: TourOutput, scene: &mut dyn SceneGraph, now_ms: f64) {
        self.events.extend(out.events);
        let Some(TourCommand::Navigate {
            experience_id,
            node_id,
        }) = out.command
        else {
            return;
        };
        if experience_id != self.engine.experience() && !self.switch_experience(&experience_id, scene)
        {
            let stopped = self.tour.stop();
            self.events.extend(stopped.events);
            return;
        }
        let started = self.engine.navigate_to(
            &self.graph,
            &self.placement,
            &node_id,
            NavOptions::from_source(NavSource::Tour),
            now_ms,
            &mut self.cache,
            &mut self.queue,
            &self.layout,
        );
        match started {
            // The landing echo in `tick` will start the step's dwell.
            NavStart::Started => {}
            // Already standing on the stop; no echo will come, so report
            // the arrival directly.
            NavStart::AlreadyThere => {
                let echoed = self.tour.on_navigation(now_ms, &node_id, false);
                self.events.extend(echoed.events);
            }
            // An unreachable stop would otherwise leave the itinerary
            // waiting forever.
            NavStart::Locked | NavStart::UnknownNode { .. } => {
                let stopped = self.tour.stop();
                self.events.extend(stopped.events);
            }
        }
    }

    /// Requests warm copies of the landed node's walkable neighbors, both in
    /// the texture cache and in the external persistent cache.
    fn warm_neighbors(&mut self, node_id: &str, hints: &mut dyn HintSink) {
        let Some(node) = self.graph.node(node_id) else {
            return;
        };
        let mut urls = Vec::new();
        for neighbor in prefetch_neighbors(&self.graph, node, self.caps.tier.prefetch_limit()) {
            let key = TextureKey::new(self.engine.experience(), neighbor.file.clone());
            let url = self.layout.pano_url(&neighbor.file, self.caps);
            if self.cache.acquire(&key) == Acquire::StartLoad {
                self.queue.push(
                    LoadPriority::Prefetch,
                    QueuedLoad {
                        key,
                        url: url.clone(),
                    },
                );
            }
            urls.push(url);
        }
        if !urls.is_empty() {
            hints.post(CacheHint::Precache { urls });
        }
    }

    fn sweep_retained(&mut self, scene: &mut dyn SceneGraph, hints: &mut dyn HintSink) {
        let Some(current_id) = self.engine.current_node().map(str::to_string) else {
            return;
        };
        let Some(current) = self.graph.node(&current_id) else {
            return;
        };
        let mut keep = retention_set(
            &self.graph,
            self.engine.experience(),
            current,
            self.cache.previous(),
            self.caps.tier.prefetch_limit(),
        );
        if let Some(key) = &self.mirror_key {
            keep.insert(key.clone());
        }
        let disposed = self.cache.retain_only(&keep);
        for (_, handle) in disposed {
            scene.dispose_texture(handle);
        }
        let urls: Vec<String> = keep
            .iter()
            .map(|k| self.layout.pano_url(&k.file, self.caps))
            .collect();
        hints.post(CacheHint::Retain { urls });
    }

    /// Yaw from the camera toward the next planned stop, for the idle drift.
    fn upcoming_yaw(&self) -> Option<f64> {
        let id = self.tour.upcoming_node()?;
        let node = self.graph.node(id)?;
        let to = self.placement.world_position(node);
        let from = self.engine.world_position();
        if from.horizontal_distance(to) < 1e-6 {
            return None;
        }
        Some(yaw_from_direction(
            Vec3::new(to.x - from.x, 0.0, to.z - from.z).normalized(),
        ))
    }
}

fn make_layout(
    content_root: &str,
    experience_id: &str,
    caps: Capabilities,
    panos_dir: Option<&str>,
) -> AssetLayout {
    let base = format!("{}/{}", content_root.trim_end_matches('/'), experience_id);
    let layout = AssetLayout::new(base, caps);
    match panos_dir {
        Some(dir) => layout.with_panos_dir(dir),
        None => layout,
    }
}
