//! Wire format for room synchronization.
//!
//! The protocol is transport-agnostic: messages are JSON text frames tagged
//! by `type`, relayed within a room. The guide broadcasts where it is; each
//! viewer reports where it is looking.

use serde::{Deserialize, Serialize};

use foundation::math::Vec3;

/// Distinct identity of one viewer within a room.
pub type Uid = String;

pub type RoomId = String;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guide,
    Viewer,
}

/// How the reporting client is rendering, which decides how its pose was
/// derived.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoseMode {
    #[serde(rename = "2d")]
    Flat,
    #[serde(rename = "xr")]
    Immersive,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub yaw: f64,
    pub pitch: f64,
    pub mode: PoseMode,
}

impl Pose {
    /// Pose from a headset forward ray (immersive mode derives look angles
    /// from the ray rather than camera euler angles).
    pub fn from_forward(dir: Vec3, mode: PoseMode) -> Self {
        Self {
            yaw: (-dir.x).atan2(dir.z),
            pitch: dir.y.clamp(-1.0, 1.0).asin(),
            mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SyncMessage {
    Join {
        room: RoomId,
        role: Role,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        uid: Option<Uid>,
    },
    #[serde(rename_all = "camelCase")]
    Sync {
        room: RoomId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<Role>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        uid: Option<Uid>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exp: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exp_path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        world_pos: Option<[f64; 3]>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pose: Option<Pose>,
    },
}

impl SyncMessage {
    /// Guide broadcast after a navigation or drag-look settles.
    pub fn guide_sync(
        room: impl Into<RoomId>,
        node_id: impl Into<String>,
        exp: impl Into<String>,
        exp_path: impl Into<String>,
        world_pos: Vec3,
    ) -> Self {
        SyncMessage::Sync {
            room: room.into(),
            from: None,
            uid: None,
            node_id: Some(node_id.into()),
            exp: Some(exp.into()),
            exp_path: Some(exp_path.into()),
            world_pos: Some([world_pos.x, world_pos.y, world_pos.z]),
            pose: None,
        }
    }

    /// Viewer look-direction report.
    pub fn viewer_sync(
        room: impl Into<RoomId>,
        uid: impl Into<Uid>,
        node_id: Option<String>,
        pose: Pose,
    ) -> Self {
        SyncMessage::Sync {
            room: room.into(),
            from: Some(Role::Viewer),
            uid: Some(uid.into()),
            node_id,
            exp: None,
            exp_path: None,
            world_pos: None,
            pose: Some(pose),
        }
    }

    pub fn room(&self) -> &str {
        match self {
            SyncMessage::Join { room, .. } | SyncMessage::Sync { room, .. } => room,
        }
    }

    /// True for sync traffic originating from a viewer.
    pub fn is_viewer_report(&self) -> bool {
        matches!(
            self,
            SyncMessage::Sync {
                from: Some(Role::Viewer),
                ..
            }
        )
    }
}
