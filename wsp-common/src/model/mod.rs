//! Room state model
//!
//! Playback and queue state plus the merge-patch types that travel between
//! clients. State values are never edited in place by the sync core: each
//! transition produces a new value via [`PlaybackState::merged`].

pub(crate) mod lenient;
mod playback;
mod queue;

pub use playback::{PlaybackPatch, PlaybackState, DEFAULT_VOLUME};
pub use queue::{index_from_wire, index_to_wire, QueuePatch, QueueState, NO_INDEX};
