//! # Web-SyncPlay Player Library (wsp-player)
//!
//! Client-side synchronization core for one room membership.
//!
//! **Purpose:** Keep a locally rendered media element converging on the room's
//! shared timeline while letting a local human gesture temporarily diverge
//! from it, without echoing peers' updates back into the room.
//!
//! **Architecture:** A single-task event loop ([`session::RoomSession`]) owns
//! the reconciler, the queue manager, the interaction guard, the transport
//! adapter and the media element. Nothing in the core is shared between
//! threads; peers converge only through the message protocol.

pub mod boundary;
pub mod config;
pub mod error;
pub mod guard;
pub mod queue_manager;
pub mod reconciler;
pub mod session;
pub mod simulated;
pub mod transport;

pub use error::{Error, Result};
pub use session::{RoomSession, SessionHandle};
