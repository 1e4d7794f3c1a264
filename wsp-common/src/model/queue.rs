//! Queue state and queue merge-patches

use serde::{Deserialize, Serialize};

/// Wire value of an unset queue index
pub const NO_INDEX: i64 = -1;

/// Ordered list of media urls and the entry currently playing from it
///
/// Invariant: `queue_index` is `None` or a valid index into `queue`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueState {
    pub queue: Vec<String>,
    pub queue_index: Option<usize>,
}

impl QueueState {
    /// Build a queue state from a peer's patch, normalizing a bad index to none
    pub fn from_patch(patch: &QueuePatch) -> Self {
        Self {
            queue: patch.queue.clone(),
            queue_index: index_from_wire(patch.queue_index, patch.queue.len()),
        }
    }

    /// Wire representation of this queue
    pub fn to_patch(&self) -> QueuePatch {
        QueuePatch {
            queue: self.queue.clone(),
            queue_index: index_to_wire(self.queue_index),
        }
    }

    /// Url of the current entry, if any
    pub fn current(&self) -> Option<&str> {
        self.queue_index
            .and_then(|i| self.queue.get(i))
            .map(String::as_str)
    }
}

/// Queue payload exchanged between clients
///
/// Queue mutations are replicated as full replacements, so the patch always
/// carries the whole list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuePatch {
    #[serde(default)]
    pub queue: Vec<String>,
    #[serde(default = "no_index")]
    pub queue_index: i64,
}

impl Default for QueuePatch {
    fn default() -> Self {
        Self {
            queue: Vec::new(),
            queue_index: NO_INDEX,
        }
    }
}

fn no_index() -> i64 {
    NO_INDEX
}

/// Convert an optional index to its wire value (-1 for none)
pub fn index_to_wire(index: Option<usize>) -> i64 {
    index.map(|i| i as i64).unwrap_or(NO_INDEX)
}

/// Convert a wire index to an optional index valid for a queue of `len` items
pub fn index_from_wire(index: i64, len: usize) -> Option<usize> {
    usize::try_from(index).ok().filter(|i| *i < len)
}
