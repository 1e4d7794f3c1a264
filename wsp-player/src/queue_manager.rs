//! Queue Manager
//!
//! Owns the room queue as seen by this client and keeps the current index
//! pointing at the same item across edits.
//!
//! Mutations are replicated as full replacements: after every local change
//! the owner broadcasts [`QueueManager::snapshot`], and a peer's queue simply
//! replaces ours (last writer wins).
//!
//! **Index policy:**
//! - Deleting an item before the current one shifts the index down
//! - Deleting the current item clears the index; the media already loaded
//!   keeps playing
//! - Swapping moves the index along with its item

use tracing::debug;
use wsp_common::model::{PlaybackPatch, QueuePatch, QueueState};

/// Local copy of the room queue
#[derive(Debug, Clone, Default)]
pub struct QueueManager {
    state: QueueState,
}

impl QueueManager {
    /// Create new empty queue manager
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &QueueState {
        &self.state
    }

    pub fn queue(&self) -> &[String] {
        &self.state.queue
    }

    pub fn queue_index(&self) -> Option<usize> {
        self.state.queue_index
    }

    /// Url of the current entry
    pub fn current(&self) -> Option<&str> {
        self.state.current()
    }

    pub fn is_empty(&self) -> bool {
        self.state.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.queue.len()
    }

    /// Append a url; the current index is unchanged
    pub fn add(&mut self, url: impl Into<String>) {
        let url = url.into();
        debug!("Queue add: {}", url);
        self.state.queue.push(url);
    }

    /// Remove the entry at `index`
    ///
    /// Returns false (and changes nothing) when the index is out of range.
    pub fn delete_at(&mut self, index: usize) -> bool {
        if index >= self.state.queue.len() {
            return false;
        }
        let removed = self.state.queue.remove(index);
        self.state.queue_index = match self.state.queue_index {
            Some(current) if index < current => Some(current - 1),
            Some(current) if index == current => None,
            other => other,
        };
        debug!(
            "Queue delete at {}: {} (index now {:?})",
            index, removed, self.state.queue_index
        );
        true
    }

    /// Exchange the entries at `i` and `j`
    ///
    /// Returns false for out-of-range indices or `i == j`.
    pub fn swap(&mut self, i: usize, j: usize) -> bool {
        let len = self.state.queue.len();
        if i >= len || j >= len || i == j {
            return false;
        }
        self.state.queue.swap(i, j);
        self.state.queue_index = self.state.queue_index.map(|current| {
            if current == i {
                j
            } else if current == j {
                i
            } else {
                current
            }
        });
        debug!("Queue swap {} <-> {}", i, j);
        true
    }

    /// Select the entry at `index` for playback
    ///
    /// Returns the patch that starts it, or None when out of range.
    pub fn play_from_queue(&mut self, index: usize) -> Option<PlaybackPatch> {
        let url = self.state.queue.get(index)?.clone();
        self.state.queue_index = Some(index);
        debug!("Queue play from {}: {}", index, url);
        Some(PlaybackPatch::load(url))
    }

    /// Play a url outside the queue; clears the current index
    pub fn play(&mut self, url: impl Into<String>) -> PlaybackPatch {
        self.state.queue_index = None;
        PlaybackPatch::load(url)
    }

    /// Index of the entry after the current one, if there is one
    pub fn next_index(&self) -> Option<usize> {
        self.state
            .queue_index
            .map(|i| i + 1)
            .filter(|next| *next < self.state.queue.len())
    }

    /// Index of the entry before the current one, if there is one
    pub fn previous_index(&self) -> Option<usize> {
        self.state.queue_index.and_then(|i| i.checked_sub(1))
    }

    /// Skip forward; None when there is no next entry
    pub fn play_next(&mut self) -> Option<PlaybackPatch> {
        let next = self.next_index()?;
        self.play_from_queue(next)
    }

    /// Skip back; None when there is no previous entry
    pub fn play_previous(&mut self) -> Option<PlaybackPatch> {
        let previous = self.previous_index()?;
        self.play_from_queue(previous)
    }

    /// Replace the queue with a peer's, normalizing an invalid index to none
    pub fn apply_remote(&mut self, patch: &QueuePatch) {
        self.state = QueueState::from_patch(patch);
        debug!(
            "Queue replaced by peer: {} entries, index {:?}",
            self.state.queue.len(),
            self.state.queue_index
        );
    }

    /// Wire form of the whole queue, for broadcast
    pub fn snapshot(&self) -> QueuePatch {
        self.state.to_patch()
    }
}
