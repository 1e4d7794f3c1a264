//! Queue and playback-end type definitions
//!
//! Supporting types for queue change and end-of-media events.

use serde::{Deserialize, Serialize};

/// Why the queue changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum QueueChangeTrigger {
    /// Url appended
    Add,
    /// Entry removed
    Delete,
    /// Two entries exchanged positions
    Swap,
    /// An entry was selected for playback
    PlayFromQueue,
    /// A url was played directly, outside the queue
    PlayDirect,
    /// Replaced by a peer's queue or the relay snapshot
    Remote,
}

impl std::fmt::Display for QueueChangeTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueChangeTrigger::Add => write!(f, "Add"),
            QueueChangeTrigger::Delete => write!(f, "Delete"),
            QueueChangeTrigger::Swap => write!(f, "Swap"),
            QueueChangeTrigger::PlayFromQueue => write!(f, "PlayFromQueue"),
            QueueChangeTrigger::PlayDirect => write!(f, "PlayDirect"),
            QueueChangeTrigger::Remote => write!(f, "Remote"),
        }
    }
}

/// What happened when the media element reached the end of the media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum EndOutcome {
    /// `loop` was set, media restarted from the beginning
    Restarted,
    /// Next queue entry started
    Advanced,
    /// Nothing left to play, playback paused
    Stopped,
}

impl std::fmt::Display for EndOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndOutcome::Restarted => write!(f, "Restarted"),
            EndOutcome::Advanced => write!(f, "Advanced"),
            EndOutcome::Stopped => write!(f, "Stopped"),
        }
    }
}
