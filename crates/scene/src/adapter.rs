//! Opaque interface to the host rendering library.
//!
//! The core never owns GPU objects; it drives the host scene graph through
//! this trait using plain handles, which keeps every subsystem testable with
//! the recording fake below.

use foundation::math::Vec3;

use crate::graph::Node;

/// Handle to a loaded panorama texture, minted by the embedder.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureHandle(pub u64);

/// Handle to a spherical display surface (dome).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceId(pub u32);

/// Handle to a camera created for the mirror grid.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CameraId(pub u32);

/// Render layer bitmask.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const IMMERSIVE: LayerMask = LayerMask(0x1);
    pub const FLAT: LayerMask = LayerMask(0x2);
    pub const MIRROR: LayerMask = LayerMask(0x4);
}

impl std::ops::BitOr for LayerMask {
    type Output = Self;

    fn bitor(self, other: Self) -> Self::Output {
        LayerMask(self.0 | other.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StereoMode {
    Mono,
    SideBySide,
}

/// Normalized viewport rectangle (origin bottom-left, unit square).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Viewport {
    pub const FULL: Viewport = Viewport {
        x: 0.0,
        y: 0.0,
        w: 1.0,
        h: 1.0,
    };
}

pub trait SceneGraph {
    fn set_surface_texture(&mut self, surface: SurfaceId, texture: TextureHandle);
    fn set_surface_alpha(&mut self, surface: SurfaceId, alpha: f64);
    fn set_surface_visible(&mut self, surface: SurfaceId, visible: bool);
    fn set_surface_stereo(&mut self, surface: SurfaceId, mode: StereoMode);
    fn dispose_texture(&mut self, texture: TextureHandle);

    fn set_world_position(&mut self, position: Vec3);
    fn set_world_yaw(&mut self, yaw: f64);
    fn set_camera_fov(&mut self, fov: f64);
    fn set_camera_layers(&mut self, mask: LayerMask);
    fn set_hardware_scaling(&mut self, scale: f64);
    fn set_main_viewport(&mut self, viewport: Viewport);

    /// Tears down and rebuilds the interactive markers for `node`, parented
    /// to the given display surface.
    fn rebuild_hotspots(&mut self, node: &Node, surface: SurfaceId);
    fn clear_hotspots(&mut self);

    fn create_mirror_camera(&mut self, uid: &str) -> CameraId;
    fn dispose_camera(&mut self, camera: CameraId);
    fn set_camera_viewport(&mut self, camera: CameraId, viewport: Viewport);
    fn set_camera_rotation(&mut self, camera: CameraId, yaw: f64, pitch: f64);
}

/// Recorded scene-graph call, used by the fake below.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneOp {
    SurfaceTexture(SurfaceId, TextureHandle),
    SurfaceAlpha(SurfaceId, f64),
    SurfaceVisible(SurfaceId, bool),
    SurfaceStereo(SurfaceId, StereoMode),
    DisposeTexture(TextureHandle),
    WorldPosition(Vec3),
    WorldYaw(f64),
    CameraFov(f64),
    CameraLayers(LayerMask),
    HardwareScaling(f64),
    MainViewport(Viewport),
    RebuildHotspots(String, SurfaceId),
    ClearHotspots,
    CreateMirrorCamera(String, CameraId),
    DisposeCamera(CameraId),
    CameraViewport(CameraId, Viewport),
    CameraRotation(CameraId, f64, f64),
}

/// In-memory scene graph that records every call and tracks the latest
/// surface state, for asserting on ordering and end state in tests.
#[derive(Debug, Default)]
pub struct RecordingSceneGraph {
    ops: Vec<SceneOp>,
    next_camera: u32,
    pub world_position: Vec3,
    pub world_yaw: f64,
    pub fov: f64,
    pub hardware_scaling: f64,
}

impl RecordingSceneGraph {
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            next_camera: 0,
            world_position: Vec3::ZERO,
            world_yaw: 0.0,
            fov: 1.0,
            hardware_scaling: 1.0,
        }
    }

    pub fn ops(&self) -> &[SceneOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<SceneOp> {
        std::mem::take(&mut self.ops)
    }

    /// Latest texture assigned to a surface, if any.
    pub fn surface_texture(&self, surface: SurfaceId) -> Option<TextureHandle> {
        self.ops.iter().rev().find_map(|op| match op {
            SceneOp::SurfaceTexture(s, t) if *s == surface => Some(*t),
            _ => None,
        })
    }

    pub fn surface_visible(&self, surface: SurfaceId) -> Option<bool> {
        self.ops.iter().rev().find_map(|op| match op {
            SceneOp::SurfaceVisible(s, v) if *s == surface => Some(*v),
            _ => None,
        })
    }

    pub fn surface_alpha(&self, surface: SurfaceId) -> Option<f64> {
        self.ops.iter().rev().find_map(|op| match op {
            SceneOp::SurfaceAlpha(s, a) if *s == surface => Some(*a),
            _ => None,
        })
    }

    pub fn disposed_textures(&self) -> Vec<TextureHandle> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                SceneOp::DisposeTexture(t) => Some(*t),
                _ => None,
            })
            .collect()
    }
}

impl SceneGraph for RecordingSceneGraph {
    fn set_surface_texture(&mut self, surface: SurfaceId, texture: TextureHandle) {
        self.ops.push(SceneOp::SurfaceTexture(surface, texture));
    }

    fn set_surface_alpha(&mut self, surface: SurfaceId, alpha: f64) {
        self.ops.push(SceneOp::SurfaceAlpha(surface, alpha));
    }

    fn set_surface_visible(&mut self, surface: SurfaceId, visible: bool) {
        self.ops.push(SceneOp::SurfaceVisible(surface, visible));
    }

    fn set_surface_stereo(&mut self, surface: SurfaceId, mode: StereoMode) {
        self.ops.push(SceneOp::SurfaceStereo(surface, mode));
    }

    fn dispose_texture(&mut self, texture: TextureHandle) {
        self.ops.push(SceneOp::DisposeTexture(texture));
    }

    fn set_world_position(&mut self, position: Vec3) {
        self.world_position = position;
        self.ops.push(SceneOp::WorldPosition(position));
    }

    fn set_world_yaw(&mut self, yaw: f64) {
        self.world_yaw = yaw;
        self.ops.push(SceneOp::WorldYaw(yaw));
    }

    fn set_camera_fov(&mut self, fov: f64) {
        self.fov = fov;
        self.ops.push(SceneOp::CameraFov(fov));
    }

    fn set_camera_layers(&mut self, mask: LayerMask) {
        self.ops.push(SceneOp::CameraLayers(mask));
    }

    fn set_hardware_scaling(&mut self, scale: f64) {
        self.hardware_scaling = scale;
        self.ops.push(SceneOp::HardwareScaling(scale));
    }

    fn set_main_viewport(&mut self, viewport: Viewport) {
        self.ops.push(SceneOp::MainViewport(viewport));
    }

    fn rebuild_hotspots(&mut self, node: &Node, surface: SurfaceId) {
        self.ops
            .push(SceneOp::RebuildHotspots(node.id.clone(), surface));
    }

    fn clear_hotspots(&mut self) {
        self.ops.push(SceneOp::ClearHotspots);
    }

    fn create_mirror_camera(&mut self, uid: &str) -> CameraId {
        let id = CameraId(self.next_camera);
        self.next_camera += 1;
        self.ops
            .push(SceneOp::CreateMirrorCamera(uid.to_string(), id));
        id
    }

    fn dispose_camera(&mut self, camera: CameraId) {
        self.ops.push(SceneOp::DisposeCamera(camera));
    }

    fn set_camera_viewport(&mut self, camera: CameraId, viewport: Viewport) {
        self.ops.push(SceneOp::CameraViewport(camera, viewport));
    }

    fn set_camera_rotation(&mut self, camera: CameraId, yaw: f64, pitch: f64) {
        self.ops.push(SceneOp::CameraRotation(camera, yaw, pitch));
    }
}
