//! Wire protocol
//!
//! Every channel frame is a JSON object `{"event": <name>, "data": <payload>}`.
//!
//! | Direction       | Event      | Payload                                   |
//! |-----------------|------------|-------------------------------------------|
//! | client → relay  | `update`   | playback merge-patch + `interaction` tag  |
//! | client → relay  | `queue`    | full queue + `queueIndex`                 |
//! | relay → client  | `snapshot` | live room state, sent once on join        |
//! | relay → client  | `update`   | forwarded from another member             |
//! | relay → client  | `queue`    | forwarded from another member             |
//!
//! Embedding hosts receive a one-way [`EmbedNotification`] for each outbound
//! playback update.

use crate::model::lenient::lenient_flag;
use crate::model::{index_from_wire, PlaybackPatch, QueuePatch, NO_INDEX};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Vendor tag carried by embedding notifications
pub const EMBED_VENDOR: &str = "Web-SyncPlay";

/// Longest accepted room id
pub const MAX_ROOM_ID_LEN: usize = 64;

/// Room ids end up in url paths: letters, digits, `-` and `_` only
pub fn is_valid_room_id(room_id: &str) -> bool {
    !room_id.is_empty()
        && room_id.len() <= MAX_ROOM_ID_LEN
        && room_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Playback merge-patch tagged with the sender's interaction flag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateMessage {
    #[serde(flatten)]
    pub patch: PlaybackPatch,
    /// True when a human gesture on the sender was in flight
    #[serde(default, deserialize_with = "lenient_flag")]
    pub interaction: bool,
}

impl UpdateMessage {
    pub fn new(patch: PlaybackPatch, interaction: bool) -> Self {
        Self { patch, interaction }
    }
}

/// Frames sent by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ClientMessage {
    Update(UpdateMessage),
    Queue(QueuePatch),
}

impl ClientMessage {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Frames sent by the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ServerMessage {
    Snapshot(RoomSnapshot),
    Update(UpdateMessage),
    Queue(QueuePatch),
}

impl ServerMessage {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Frame name, for logging
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::Snapshot(_) => "snapshot",
            ServerMessage::Update(_) => "update",
            ServerMessage::Queue(_) => "queue",
        }
    }
}

/// Live shared state of a room
///
/// Holds only the room-wide fields: volume and mute stay with each listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub playing: bool,
    #[serde(default)]
    pub played: f64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default = "default_rate")]
    pub playback_rate: f64,
    #[serde(rename = "loop", default)]
    pub looping: bool,
    #[serde(default)]
    pub queue: Vec<String>,
    #[serde(default = "no_index")]
    pub queue_index: i64,
}

impl Default for RoomSnapshot {
    fn default() -> Self {
        Self {
            url: String::new(),
            playing: false,
            played: 0.0,
            duration: 0.0,
            playback_rate: 1.0,
            looping: false,
            queue: Vec::new(),
            queue_index: NO_INDEX,
        }
    }
}

fn default_rate() -> f64 {
    1.0
}

fn no_index() -> i64 {
    NO_INDEX
}

impl RoomSnapshot {
    /// Merge a playback update into the room state
    ///
    /// The patch is sanitized first; volume and mute are ignored. A new url
    /// rewinds the room to the start of the new media.
    pub fn apply_update(&mut self, patch: &PlaybackPatch) {
        let patch = patch.clone().sanitized();
        if let Some(url) = patch.url {
            if url != self.url {
                self.played = 0.0;
                self.duration = 0.0;
            }
            self.url = url;
        }
        if let Some(playing) = patch.playing {
            self.playing = playing;
        }
        if let Some(played) = patch.played {
            self.played = played;
        }
        if let Some(duration) = patch.duration {
            self.duration = duration;
        }
        if let Some(rate) = patch.playback_rate {
            self.playback_rate = rate;
        }
        if let Some(looping) = patch.looping {
            self.looping = looping;
        }
    }

    /// Replace the room queue
    pub fn apply_queue(&mut self, patch: &QueuePatch) {
        self.queue = patch.queue.clone();
        self.queue_index = index_from_wire(patch.queue_index, self.queue.len())
            .map(|i| i as i64)
            .unwrap_or(NO_INDEX);
    }

    /// Playback part of the snapshot as a merge-patch
    pub fn playback_patch(&self) -> PlaybackPatch {
        PlaybackPatch {
            url: Some(self.url.clone()),
            playing: Some(self.playing),
            played: Some(self.played),
            duration: Some(self.duration),
            playback_rate: Some(self.playback_rate),
            looping: Some(self.looping),
            ..Default::default()
        }
    }

    /// Queue part of the snapshot
    pub fn queue_patch(&self) -> QueuePatch {
        QueuePatch {
            queue: self.queue.clone(),
            queue_index: self.queue_index,
        }
    }
}

/// One-way notification posted to an embedding host
///
/// Receivers must check `vendor` before trusting `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedNotification {
    pub vendor: String,
    pub data: UpdateMessage,
}

impl EmbedNotification {
    pub fn new(data: UpdateMessage) -> Self {
        Self {
            vendor: EMBED_VENDOR.to_string(),
            data,
        }
    }

    /// Parse a host message and return its data only if it carries our vendor tag
    pub fn from_host_message(text: &str) -> Option<UpdateMessage> {
        let notification: EmbedNotification = serde_json::from_str(text).ok()?;
        notification.is_trusted().then_some(notification.data)
    }

    pub fn is_trusted(&self) -> bool {
        self.vendor == EMBED_VENDOR
    }
}
