//! # Web-SyncPlay Common Library
//!
//! Shared code for the player core and the room relay:
//! - Playback and queue state model with merge-patch application
//! - Wire protocol (channel frames and embedding notifications)
//! - Room event types (RoomEvent enum) and EventBus
//! - Bootstrap configuration and sync tuning
//! - Time helpers

pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod protocol;
pub mod time;

pub use error::{Error, Result};
pub use model::{PlaybackPatch, PlaybackState, QueuePatch, QueueState};
pub use protocol::{ClientMessage, EmbedNotification, RoomSnapshot, ServerMessage, UpdateMessage};
