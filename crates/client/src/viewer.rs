//! The viewer (follower) session: applies the guide's broadcasts and reports
//! its own look direction back at a bounded rate.

use navigation::{DomeRig, NavOptions, NavSource, NavigationEngine};
use runtime::budget::FrameBudget;
use runtime::frame::Frame;
use scene::{Capabilities, FloorPlacement, SceneGraph, TextureHandle, WalkGraph};
use streaming::{LoadQueue, QueuedLoad, TextureCache, TextureKey};
use sync::{PoseMode, PoseReporter, ReconnectSchedule, Role, RoomId, SyncMessage, Uid};

use crate::config::SessionConfig;
use formats::AssetLayout;

/// A guide instruction the session cannot satisfy with its loaded content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteUpdate {
    None,
    /// The guide moved to another experience; the embedder must fetch its
    /// descriptor and call `switch_experience`.
    SwitchExperience { exp: String, exp_path: String },
}

pub struct ViewerSession {
    caps: Capabilities,
    room: RoomId,
    uid: Uid,
    exp_path: String,
    panos_dir_override: Option<String>,
    graph: WalkGraph,
    placement: FloorPlacement,
    layout: AssetLayout,
    engine: NavigationEngine,
    cache: TextureCache,
    queue: LoadQueue,
    reporter: PoseReporter,
    reconnect: ReconnectSchedule,
    outbound: Vec<SyncMessage>,
}

impl ViewerSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        caps: Capabilities,
        rig: DomeRig,
        config: &SessionConfig,
        uid: impl Into<Uid>,
        experience_id: &str,
        exp_path: &str,
        graph: WalkGraph,
        reconnect: ReconnectSchedule,
    ) -> Self {
        let placement = FloorPlacement::from_graph(&graph);
        let layout = match config.panos_dir.as_deref() {
            Some(dir) => AssetLayout::new(exp_path, caps).with_panos_dir(dir),
            None => AssetLayout::new(exp_path, caps),
        };
        Self {
            caps,
            room: config.room.clone(),
            uid: uid.into(),
            exp_path: exp_path.trim_end_matches('/').to_string(),
            panos_dir_override: config.panos_dir.clone(),
            graph,
            placement,
            layout,
            engine: NavigationEngine::new(caps, rig, experience_id),
            cache: TextureCache::new(caps.tier.follower_texture_limit()),
            queue: LoadQueue::new(),
            reporter: PoseReporter::new(),
            reconnect,
            outbound: Vec::new(),
        }
    }

    pub fn engine(&self) -> &NavigationEngine {
        &self.engine
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn drain_outbound(&mut self) -> Vec<SyncMessage> {
        std::mem::take(&mut self.outbound)
    }

    /// One frame: only the transition needs driving; followers do no
    /// planning or prefetching of their own.
    pub fn tick(&mut self, frame: Frame, scene: &mut dyn SceneGraph) {
        self.engine.advance(frame, scene, &mut self.cache);
    }

    /// Offers the current look direction to the change-gated reporter and
    /// queues the wire message when it decides to send.
    pub fn sample_pose(&mut self, now_ms: f64, yaw: f64, pitch: f64, mode: PoseMode) {
        if let Some(pose) = self.reporter.sample(now_ms, yaw, pitch, mode) {
            self.outbound.push(SyncMessage::viewer_sync(
                self.room.clone(),
                self.uid.clone(),
                self.engine.current_node().map(str::to_string),
                pose,
            ));
        }
    }

    /// Applies one guide broadcast. Look-direction chatter from other
    /// viewers is ignored.
    pub fn apply_remote(&mut self, msg: &SyncMessage, now_ms: f64) -> RemoteUpdate {
        if msg.is_viewer_report() {
            return RemoteUpdate::None;
        }
        let SyncMessage::Sync {
            node_id,
            exp,
            exp_path,
            ..
        } = msg
        else {
            return RemoteUpdate::None;
        };

        if let (Some(exp), Some(path)) = (exp, exp_path) {
            if path.trim_end_matches('/') != self.exp_path {
                return RemoteUpdate::SwitchExperience {
                    exp: exp.clone(),
                    exp_path: path.clone(),
                };
            }
        }
        if let Some(node_id) = node_id {
            self.engine.navigate_to(
                &self.graph,
                &self.placement,
                node_id,
                NavOptions {
                    source: NavSource::Remote,
                    sync: false,
                    ..NavOptions::default()
                },
                now_ms,
                &mut self.cache,
                &mut self.queue,
                &self.layout,
            );
        }
        RemoteUpdate::None
    }

    /// Installs the experience the guide moved to, once the embedder has its
    /// graph.
    pub fn switch_experience(
        &mut self,
        experience_id: &str,
        exp_path: &str,
        graph: WalkGraph,
        scene: &mut dyn SceneGraph,
    ) {
        for (_, handle) in self.cache.purge_all() {
            scene.dispose_texture(handle);
        }
        self.queue = LoadQueue::new();
        scene.clear_hotspots();
        self.placement = FloorPlacement::from_graph(&graph);
        self.graph = graph;
        self.exp_path = exp_path.trim_end_matches('/').to_string();
        self.layout = match self.panos_dir_override.as_deref() {
            Some(dir) => AssetLayout::new(self.exp_path.clone(), self.caps).with_panos_dir(dir),
            None => AssetLayout::new(self.exp_path.clone(), self.caps),
        };
        self.engine.set_experience(experience_id);
    }

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
            }
            Err(_) => scene.dispose_texture(handle),
        }
    }

    pub fn load_failed(&mut self, key: &TextureKey) {
        let _ = self.cache.fail(key);
    }

    pub fn dial_endpoint(&self) -> Option<&str> {
        self.reconnect.current()
    }

    pub fn on_connected(&mut self) {
        self.reconnect.on_open();
        self.outbound.push(SyncMessage::Join {
            room: self.room.clone(),
            role: Role::Viewer,
            uid: Some(self.uid.clone()),
        });
    }

    pub fn on_disconnected(&mut self) -> f64 {
        self.reconnect.on_failure()
    }
}
