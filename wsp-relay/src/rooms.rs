//! Room registry
//!
//! A room exists while it has at least one member. It holds the merged
//! [`RoomSnapshot`] and a broadcast channel carrying every relayed frame
//! together with the id of the member that sent it, so that each member's
//! sender task can skip its own frames.
//!
//! Joining takes the snapshot and subscribes under the same write lock, so a
//! joiner never misses a frame published between the two.

use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};
use uuid::Uuid;
use wsp_common::protocol::{ClientMessage, RoomSnapshot, ServerMessage, UpdateMessage};

/// Per-room fan-out channel capacity
pub const FRAME_CAPACITY: usize = 256;

/// A frame relayed to the members of a room
#[derive(Debug, Clone)]
pub struct RelayFrame {
    /// Member that sent the frame
    pub sender: Uuid,
    pub message: ServerMessage,
}

/// A member's view of the room it joined
pub struct Membership {
    pub member_id: Uuid,
    pub room_id: String,
    /// Room state at the moment of joining
    pub snapshot: RoomSnapshot,
    pub frames: broadcast::Receiver<RelayFrame>,
}

/// Public summary of a room
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomSummary {
    pub room_id: String,
    pub members: usize,
    pub url: String,
    pub playing: bool,
}

struct Room {
    snapshot: RoomSnapshot,
    tx: broadcast::Sender<RelayFrame>,
    members: usize,
}

/// All live rooms of the relay
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Room>>,
    capacity: usize,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(FRAME_CAPACITY)
    }
}

impl RoomRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Join a room, creating it on first join
    pub async fn join(&self, room_id: &str) -> Membership {
        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(room_id.to_string()).or_insert_with(|| {
            info!("Room {} created", room_id);
            Room {
                snapshot: RoomSnapshot::default(),
                tx: broadcast::channel(self.capacity).0,
                members: 0,
            }
        });
        room.members += 1;

        let member_id = Uuid::new_v4();
        info!(
            "Member {} joined room {} ({} members)",
            member_id, room_id, room.members
        );
        Membership {
            member_id,
            room_id: room_id.to_string(),
            snapshot: room.snapshot.clone(),
            frames: room.tx.subscribe(),
        }
    }

    /// Leave a room; the room is dropped with its last member
    pub async fn leave(&self, room_id: &str, member_id: Uuid) {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return;
        };
        room.members = room.members.saturating_sub(1);
        info!(
            "Member {} left room {} ({} members)",
            member_id, room_id, room.members
        );
        if room.members == 0 {
            rooms.remove(room_id);
            info!("Room {} closed", room_id);
        }
    }

    /// Merge a member's frame into the room and forward it to everyone else
    ///
    /// Returns the number of receivers the frame was handed to, including
    /// the sender's own subscription.
    pub async fn publish(
        &self,
        room_id: &str,
        sender: Uuid,
        message: ClientMessage,
    ) -> Result<usize> {
        let mut rooms = self.rooms.write().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| Error::RoomNotFound(room_id.to_string()))?;

        let forwarded = match message {
            ClientMessage::Update(update) => {
                let patch = update.patch.sanitized();
                room.snapshot.apply_update(&patch);
                debug!(
                    "Room {}: update from {} (interaction={})",
                    room_id, sender, update.interaction
                );
                ServerMessage::Update(UpdateMessage::new(patch, update.interaction))
            }
            ClientMessage::Queue(queue) => {
                room.snapshot.apply_queue(&queue);
                debug!(
                    "Room {}: queue from {} ({} entries)",
                    room_id,
                    sender,
                    room.snapshot.queue.len()
                );
                ServerMessage::Queue(room.snapshot.queue_patch())
            }
        };

        // No receivers is fine: the sender may be alone in the room
        Ok(room
            .tx
            .send(RelayFrame {
                sender,
                message: forwarded,
            })
            .unwrap_or(0))
    }

    /// Current merged state of a room
    pub async fn snapshot(&self, room_id: &str) -> Result<RoomSnapshot> {
        let rooms = self.rooms.read().await;
        rooms
            .get(room_id)
            .map(|room| room.snapshot.clone())
            .ok_or_else(|| Error::RoomNotFound(room_id.to_string()))
    }

    /// Observe a room's relayed frames without becoming a member
    pub async fn observe(&self, room_id: &str) -> Result<broadcast::Receiver<RelayFrame>> {
        let rooms = self.rooms.read().await;
        rooms
            .get(room_id)
            .map(|room| room.tx.subscribe())
            .ok_or_else(|| Error::RoomNotFound(room_id.to_string()))
    }

    pub async fn summaries(&self) -> Vec<RoomSummary> {
        let rooms = self.rooms.read().await;
        let mut summaries: Vec<RoomSummary> = rooms
            .iter()
            .map(|(room_id, room)| RoomSummary {
                room_id: room_id.clone(),
                members: room.members,
                url: room.snapshot.url.clone(),
                playing: room.snapshot.playing,
            })
            .collect();
        summaries.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        summaries
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsp_common::model::{PlaybackPatch, QueuePatch};

    fn update(patch: PlaybackPatch) -> ClientMessage {
        ClientMessage::Update(UpdateMessage::new(patch, false))
    }

    #[tokio::test]
    async fn test_room_lifecycle() {
        let registry = RoomRegistry::default();
        let a = registry.join("r1").await;
        let b = registry.join("r1").await;
        assert_eq!(registry.room_count().await, 1);
        assert_eq!(registry.summaries().await[0].members, 2);

        registry.leave("r1", a.member_id).await;
        assert_eq!(registry.room_count().await, 1);
        registry.leave("r1", b.member_id).await;
        assert_eq!(registry.room_count().await, 0);
        assert!(matches!(
            registry.snapshot("r1").await,
            Err(Error::RoomNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_merges_snapshot() {
        let registry = RoomRegistry::default();
        let member = registry.join("r1").await;

        registry
            .publish("r1", member.member_id, update(PlaybackPatch::load("a.mp4")))
            .await
            .unwrap();
        registry
            .publish(
                "r1",
                member.member_id,
                update(PlaybackPatch {
                    played: Some(1.7),
                    volume: Some(0.9),
                    ..Default::default()
                }),
            )
            .await
            .unwrap();

        let snapshot = registry.snapshot("r1").await.unwrap();
        assert_eq!(snapshot.url, "a.mp4");
        assert!(snapshot.playing);
        assert_eq!(snapshot.played, 1.0);
    }

    #[tokio::test]
    async fn test_frames_carry_sender() {
        let registry = RoomRegistry::default();
        let alice = registry.join("r1").await;
        let mut bob = registry.join("r1").await;

        let receivers = registry
            .publish(
                "r1",
                alice.member_id,
                ClientMessage::Queue(QueuePatch {
                    queue: vec!["a".into()],
                    queue_index: 4,
                }),
            )
            .await
            .unwrap();
        assert_eq!(receivers, 2);

        let frame = bob.frames.recv().await.unwrap();
        assert_eq!(frame.sender, alice.member_id);
        match frame.message {
            // Index normalized before forwarding
            ServerMessage::Queue(queue) => assert_eq!(queue.queue_index, -1),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_joiner_gets_merged_snapshot() {
        let registry = RoomRegistry::default();
        let alice = registry.join("r1").await;
        registry
            .publish("r1", alice.member_id, update(PlaybackPatch::load("a.mp4")))
            .await
            .unwrap();
        registry
            .publish("r1", alice.member_id, update(PlaybackPatch::seek(0.5)))
            .await
            .unwrap();

        let bob = registry.join("r1").await;
        assert_eq!(bob.snapshot.url, "a.mp4");
        assert_eq!(bob.snapshot.played, 0.5);
    }

    #[tokio::test]
    async fn test_publish_to_missing_room() {
        let registry = RoomRegistry::default();
        let result = registry
            .publish("nope", Uuid::new_v4(), update(PlaybackPatch::playing(true)))
            .await;
        assert!(matches!(result, Err(Error::RoomNotFound(_))));
    }
}
