//! # Web-SyncPlay Relay (wsp-relay)
//!
//! Room-scoped message relay for the synchronization core.
//!
//! **Purpose:** Fan out playback and queue updates between the members of a
//! room, and keep a merged snapshot so that late joiners start from the
//! room's current state.
//!
//! **Architecture:** Axum HTTP server with a WebSocket endpoint per room. The
//! room registry lives behind a tokio RwLock; each room fans out through a
//! tokio broadcast channel, and each connection runs its own sender task.

pub mod api;
pub mod error;
pub mod rooms;

pub use error::{Error, Result};
pub use rooms::RoomRegistry;
