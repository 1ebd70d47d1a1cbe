//! Room registry and message routing.
//!
//! The relay is content-blind: it parses frames only far enough to learn the
//! room, the sender's role, and the direction. Viewer reports go to the
//! room's guide; everything the guide says fans out to every viewer.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use sync::{Role, RoomId, SyncMessage, Uid};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-peer outbound queue depth. A peer that cannot drain this many frames
/// starts losing them; poses are superseded by the next one anyway.
const PEER_QUEUE: usize = 64;

#[derive(Clone)]
struct Peer {
    tx: mpsc::Sender<String>,
}

#[derive(Default)]
struct Room {
    guide: Option<Peer>,
    viewers: HashMap<Uid, Peer>,
}

/// What a socket registered as, used to clean up on disconnect.
enum Registration {
    Guide { room: RoomId },
    Viewer { room: RoomId, uid: Uid },
}

pub struct Rooms {
    rooms: DashMap<RoomId, Room>,
}

impl Rooms {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    fn join(
        &self,
        room: RoomId,
        role: Role,
        uid: Option<Uid>,
        tx: mpsc::Sender<String>,
    ) -> Registration {
        let mut entry = self.rooms.entry(room.clone()).or_default();
        match role {
            Role::Guide => {
                // A reconnecting guide displaces its stale predecessor.
                if entry.guide.is_some() {
                    info!("room {room}: replacing guide");
                }
                entry.guide = Some(Peer { tx });
                Registration::Guide { room }
            }
            Role::Viewer => {
                let uid = uid.unwrap_or_else(|| Uuid::new_v4().to_string());
                entry.viewers.insert(uid.clone(), Peer { tx });
                Registration::Viewer { room, uid }
            }
        }
    }

    fn leave(&self, registration: &Registration) {
        let room = match registration {
            Registration::Guide { room } => {
                if let Some(mut entry) = self.rooms.get_mut(room) {
                    entry.guide = None;
                }
                room
            }
            Registration::Viewer { room, uid } => {
                if let Some(mut entry) = self.rooms.get_mut(room) {
                    entry.viewers.remove(uid);
                }
                room
            }
        };
        self.rooms
            .remove_if(room, |_, r| r.guide.is_none() && r.viewers.is_empty());
    }

    /// Forwards one sync frame. The raw text is passed through untouched so
    /// receivers see exactly what the sender wrote.
    fn relay(&self, msg: &SyncMessage, raw: &str) {
        let Some(room) = self.rooms.get(msg.room()) else {
            return;
        };
        if msg.is_viewer_report() {
            if let Some(guide) = &room.guide {
                if guide.tx.try_send(raw.to_string()).is_err() {
                    debug!("room {}: guide queue full, dropping frame", msg.room());
                }
            }
        } else {
            for peer in room.viewers.values() {
                if peer.tx.try_send(raw.to_string()).is_err() {
                    debug!("room {}: viewer queue full, dropping frame", msg.room());
                }
            }
        }
    }
}

pub async fn handle_socket(socket: WebSocket, rooms: Arc<Rooms>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(PEER_QUEUE);

    let sender = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut registration: Option<Registration> = None;

    while let Some(msg) = ws_rx.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                warn!("ws receive error: {e}");
                break;
            }
        };
        match msg {
            Message::Text(text) => {
                let parsed: SyncMessage = match serde_json::from_str(&text) {
                    Ok(p) => p,
                    Err(e) => {
                        debug!("unparseable frame: {e}");
                        continue;
                    }
                };
                match parsed {
                    SyncMessage::Join { room, role, uid } => {
                        if let Some(old) = registration.take() {
                            rooms.leave(&old);
                        }
                        registration = Some(rooms.join(room, role, uid, tx.clone()));
                    }
                    sync @ SyncMessage::Sync { .. } => {
                        rooms.relay(&sync, &text);
                    }
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    if let Some(registration) = registration {
        rooms.leave(&registration);
    }
    drop(tx);
    let _ = sender.await;
}

#[cfg(test)]
mod tests {
    use super::{Rooms, PEER_QUEUE};
    use sync::{Pose, PoseMode, Role, SyncMessage};
    use tokio::sync::mpsc;

    fn raw(msg: &SyncMessage) -> String {
        serde_json::to_string(msg).unwrap()
    }

    fn guide_move() -> SyncMessage {
        SyncMessage::guide_sync(
            "demo",
            "n1",
            "skywalk",
            "experiences/skywalk",
            foundation::math::Vec3::ZERO,
        )
    }

    fn viewer_report(uid: &str) -> SyncMessage {
        SyncMessage::viewer_sync(
            "demo",
            uid,
            None,
            Pose {
                yaw: 0.1,
                pitch: 0.0,
                mode: PoseMode::Flat,
            },
        )
    }

    #[test]
    fn guide_frames_fan_out_to_viewers_only() {
        let rooms = Rooms::new();
        let (gtx, mut grx) = mpsc::channel(PEER_QUEUE);
        let (vtx, mut vrx) = mpsc::channel(PEER_QUEUE);

        rooms.join("demo".to_string(), Role::Guide, None, gtx);
        rooms.join("demo".to_string(), Role::Viewer, Some("u1".to_string()), vtx);

        let msg = guide_move();
        rooms.relay(&msg, &raw(&msg));

        assert!(vrx.try_recv().is_ok());
        assert!(grx.try_recv().is_err());
    }

    #[test]
    fn viewer_reports_go_to_the_guide_only() {
        let rooms = Rooms::new();
        let (gtx, mut grx) = mpsc::channel(PEER_QUEUE);
        let (v1tx, mut v1rx) = mpsc::channel(PEER_QUEUE);
        let (v2tx, mut v2rx) = mpsc::channel(PEER_QUEUE);

        rooms.join("demo".to_string(), Role::Guide, None, gtx);
        rooms.join("demo".to_string(), Role::Viewer, Some("u1".to_string()), v1tx);
        rooms.join("demo".to_string(), Role::Viewer, Some("u2".to_string()), v2tx);

        let msg = viewer_report("u1");
        rooms.relay(&msg, &raw(&msg));

        assert!(grx.try_recv().is_ok());
        assert!(v1rx.try_recv().is_err());
        assert!(v2rx.try_recv().is_err());
    }

    #[test]
    fn rooms_are_isolated() {
        let rooms = Rooms::new();
        let (gtx, mut grx) = mpsc::channel(PEER_QUEUE);
        rooms.join("other".to_string(), Role::Guide, None, gtx);

        let msg = viewer_report("u1"); // addressed to room "demo"
        rooms.relay(&msg, &raw(&msg));
        assert!(grx.try_recv().is_err());
    }

    #[test]
    fn leaving_empties_and_drops_the_room() {
        let rooms = Rooms::new();
        let (vtx, _vrx) = mpsc::channel(PEER_QUEUE);
        let reg = rooms.join("demo".to_string(), Role::Viewer, None, vtx);

        // An anonymous viewer still gets a minted uid.
        let super::Registration::Viewer { uid, .. } = &reg else {
            panic!("expected viewer registration");
        };
        assert!(!uid.is_empty());

        rooms.leave(&reg);
        assert!(rooms.rooms.get("demo").is_none());
    }

    #[test]
    fn reconnecting_guide_replaces_the_old_one() {
        let rooms = Rooms::new();
        let (g1tx, mut g1rx) = mpsc::channel(PEER_QUEUE);
        let (g2tx, mut g2rx) = mpsc::channel(PEER_QUEUE);
        rooms.join("demo".to_string(), Role::Guide, None, g1tx);
        rooms.join("demo".to_string(), Role::Guide, None, g2tx);

        let msg = viewer_report("u1");
        rooms.relay(&msg, &raw(&msg));
        assert!(g2rx.try_recv().is_ok());
        assert!(g1rx.try_recv().is_err());
    }
}
