//! Render boundary between the sync core and a media element
//!
//! The core renders declaratively: after every transition it hands the
//! element a full [`PlayerProps`] value and lets the element diff it. The one
//! imperative command is [`MediaElement::seek_to`]. Element callbacks flow
//! back as [`MediaEvent`]s.

use tokio::time::Instant;

/// Declarative description of what the media element should be doing
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerProps {
    pub url: String,
    pub playing: bool,
    pub looping: bool,
    pub playback_rate: f64,
    pub volume: f64,
    pub muted: bool,
    /// Show the element's native controls
    pub controls: bool,
}

/// Callbacks a media element reports
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Media can start playing
    Ready,
    Play,
    Pause,
    /// Playback stalled waiting for data
    Buffer,
    BufferEnd,
    /// Periodic position report, both values as fractions
    Progress { played: f64, loaded: f64 },
    /// Media duration in seconds became known
    Duration(f64),
    /// User started scrubbing
    SeekStart,
    /// Element finished a seek
    Seeked,
    /// Playback reached the end of the media
    Ended,
    Error(String),
}

impl MediaEvent {
    pub fn name(&self) -> &'static str {
        match self {
            MediaEvent::Ready => "ready",
            MediaEvent::Play => "play",
            MediaEvent::Pause => "pause",
            MediaEvent::Buffer => "buffer",
            MediaEvent::BufferEnd => "buffer_end",
            MediaEvent::Progress { .. } => "progress",
            MediaEvent::Duration(_) => "duration",
            MediaEvent::SeekStart => "seek_start",
            MediaEvent::Seeked => "seeked",
            MediaEvent::Ended => "ended",
            MediaEvent::Error(_) => "error",
        }
    }
}

/// A media element driven by the sync core
///
/// Elements that push their callbacks asynchronously deliver them through
/// the session's media event channel. Elements that are stepped by the
/// session instead report them from [`MediaElement::poll`], which the session
/// calls on its progress cadence.
pub trait MediaElement: Send {
    /// Bring the element in line with `props`
    fn render(&mut self, props: &PlayerProps);

    /// Jump to an absolute position in seconds
    fn seek_to(&mut self, seconds: f64);

    /// Collect callbacks produced since the last poll
    fn poll(&mut self, _now: Instant) -> Vec<MediaEvent> {
        Vec::new()
    }
}
