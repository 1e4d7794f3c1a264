//! Playback state and playback merge-patches

use super::lenient::lenient;
use serde::{Deserialize, Serialize};

/// Volume a client starts with when it joins a room
pub const DEFAULT_VOLUME: f64 = 0.3;

/// Playback state of one room membership
///
/// `played` is a fraction of the *local* `duration`, because durations are not
/// comparable across clients until every media element reported its own.
///
/// `volume` and `muted` belong to the local listener and are never adopted
/// from peers. `loaded`, `ready`, `buffering` and `seeking` are transient and
/// never leave the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    /// Currently loaded media resource
    pub url: String,
    pub playing: bool,
    /// Position as fraction of duration, in [0, 1]
    pub played: f64,
    /// Media duration in seconds, 0 means unknown
    pub duration: f64,
    pub playback_rate: f64,
    #[serde(rename = "loop")]
    pub looping: bool,
    /// Local volume in [0, 1]
    pub volume: f64,
    pub muted: bool,
    /// Buffered fraction reported by the media element
    #[serde(skip)]
    pub loaded: f64,
    #[serde(skip)]
    pub ready: bool,
    #[serde(skip)]
    pub buffering: bool,
    #[serde(skip)]
    pub seeking: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            url: String::new(),
            playing: false,
            played: 0.0,
            duration: 0.0,
            playback_rate: 1.0,
            looping: false,
            volume: DEFAULT_VOLUME,
            muted: true,
            loaded: 0.0,
            ready: false,
            buffering: false,
            seeking: false,
        }
    }
}

impl PlaybackState {
    /// Apply a merge-patch, returning the new state
    ///
    /// Only fields present in the patch are written. The patch is expected to
    /// be sanitized already (see [`PlaybackPatch::sanitized`]).
    pub fn merged(&self, patch: &PlaybackPatch) -> Self {
        let mut next = self.clone();
        if let Some(url) = &patch.url {
            next.url = url.clone();
        }
        if let Some(playing) = patch.playing {
            next.playing = playing;
        }
        if let Some(played) = patch.played {
            next.played = played;
        }
        if let Some(duration) = patch.duration {
            next.duration = duration;
        }
        if let Some(rate) = patch.playback_rate {
            next.playback_rate = rate;
        }
        if let Some(looping) = patch.looping {
            next.looping = looping;
        }
        if let Some(volume) = patch.volume {
            next.volume = volume;
        }
        if let Some(muted) = patch.muted {
            next.muted = muted;
        }
        if let Some(loaded) = patch.loaded {
            next.loaded = loaded;
        }
        if let Some(ready) = patch.ready {
            next.ready = ready;
        }
        if let Some(buffering) = patch.buffering {
            next.buffering = buffering;
        }
        if let Some(seeking) = patch.seeking {
            next.seeking = seeking;
        }
        next
    }

    /// Current position in seconds of the local media
    pub fn position_secs(&self) -> f64 {
        self.played * self.duration
    }

    /// Seconds-equivalent distance between the local position and `remote_played`
    ///
    /// Scaled by the local duration and playback rate.
    pub fn drift_secs(&self, remote_played: f64) -> f64 {
        (self.played - remote_played).abs() * self.duration * self.playback_rate
    }

    /// Paused within the last second of the media
    pub fn has_ended(&self) -> bool {
        !self.playing && (1.0 - self.played) * self.duration < 1.0
    }
}

/// Partial playback state: only changed fields are present
///
/// Serialized with the wire key names (`playbackRate`, `loop`). Transient
/// fields are skipped in both directions, so they can never arrive from or
/// leave for a peer. Unknown keys are ignored and malformed values are
/// dropped field by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackPatch {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub playing: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub played: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub playback_rate: Option<f64>,
    #[serde(
        rename = "loop",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub looping: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
    #[serde(skip)]
    pub loaded: Option<f64>,
    #[serde(skip)]
    pub ready: Option<bool>,
    #[serde(skip)]
    pub buffering: Option<bool>,
    #[serde(skip)]
    pub seeking: Option<bool>,
}

impl PlaybackPatch {
    /// Patch that moves the position to `fraction`
    pub fn seek(fraction: f64) -> Self {
        Self {
            played: Some(fraction),
            ..Default::default()
        }
    }

    /// Patch that sets the play/pause state
    pub fn playing(playing: bool) -> Self {
        Self {
            playing: Some(playing),
            ..Default::default()
        }
    }

    /// Patch that loads `url` and starts it from the beginning
    pub fn load(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            played: Some(0.0),
            playing: Some(true),
            ..Default::default()
        }
    }

    /// Patch that restarts the current media from the beginning
    pub fn restart() -> Self {
        Self {
            played: Some(0.0),
            playing: Some(true),
            ..Default::default()
        }
    }

    /// Clamp and default every field so the patch is safe to merge
    ///
    /// - `played`, `loaded` and `volume` are clamped to [0, 1]
    /// - non-finite numbers are dropped
    /// - negative `duration` is dropped
    /// - non-positive `playback_rate` is dropped
    pub fn sanitized(mut self) -> Self {
        self.played = self.played.and_then(finite).map(unit);
        self.loaded = self.loaded.and_then(finite).map(unit);
        self.volume = self.volume.and_then(finite).map(unit);
        self.duration = self.duration.and_then(finite).filter(|d| *d >= 0.0);
        self.playback_rate = self.playback_rate.and_then(finite).filter(|r| *r > 0.0);
        self
    }

    /// Copy of the patch without the fields that stay on this client
    pub fn wire_part(&self) -> Self {
        Self {
            loaded: None,
            ready: None,
            buffering: None,
            seeking: None,
            ..self.clone()
        }
    }

    /// Copy of the patch without the listener-local volume fields
    pub fn without_volume(&self) -> Self {
        Self {
            volume: None,
            muted: None,
            ..self.clone()
        }
    }

    /// True if at least one field would be serialized
    pub fn has_wire_fields(&self) -> bool {
        self.url.is_some()
            || self.playing.is_some()
            || self.played.is_some()
            || self.duration.is_some()
            || self.playback_rate.is_some()
            || self.looping.is_some()
            || self.volume.is_some()
            || self.muted.is_some()
    }

    /// True if no field at all is set
    pub fn is_empty(&self) -> bool {
        !self.has_wire_fields()
            && self.loaded.is_none()
            && self.ready.is_none()
            && self.buffering.is_none()
            && self.seeking.is_none()
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_on_join() {
        let state = PlaybackState::default();
        assert!(!state.playing);
        assert!(state.muted);
        assert_eq!(state.volume, 0.3);
        assert_eq!(state.played, 0.0);
        assert_eq!(state.duration, 0.0);
        assert_eq!(state.playback_rate, 1.0);
        assert!(!state.ready);
    }

    #[test]
    fn test_merge_only_touches_present_fields() {
        let state = PlaybackState {
            url: "a".to_string(),
            duration: 100.0,
            ..Default::default()
        };

        let next = state.merged(&PlaybackPatch::playing(true));
        assert!(next.playing);
        assert_eq!(next.url, "a");
        assert_eq!(next.duration, 100.0);

        // Original snapshot is untouched
        assert!(!state.playing);
    }

    #[test]
    fn test_sanitize_clamps_fractions() {
        let patch = PlaybackPatch {
            played: Some(1.7),
            volume: Some(-0.2),
            loaded: Some(3.0),
            ..Default::default()
        }
        .sanitized();

        assert_eq!(patch.played, Some(1.0));
        assert_eq!(patch.volume, Some(0.0));
        assert_eq!(patch.loaded, Some(1.0));
    }

    #[test]
    fn test_sanitize_drops_nonsense_numbers() {
        let patch = PlaybackPatch {
            played: Some(f64::NAN),
            duration: Some(-4.0),
            playback_rate: Some(0.0),
            ..Default::default()
        }
        .sanitized();

        assert_eq!(patch.played, None);
        assert_eq!(patch.duration, None);
        assert_eq!(patch.playback_rate, None);
    }

    #[test]
    fn test_wire_names() {
        let patch = PlaybackPatch {
            playback_rate: Some(1.5),
            looping: Some(true),
            ready: Some(true),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({"playbackRate": 1.5, "loop": true}));
    }

    #[test]
    fn test_transient_fields_never_deserialized() {
        let patch: PlaybackPatch =
            serde_json::from_str(r#"{"ready": true, "seeking": true, "played": 0.5}"#).unwrap();
        assert_eq!(patch.ready, None);
        assert_eq!(patch.seeking, None);
        assert_eq!(patch.played, Some(0.5));
    }

    #[test]
    fn test_malformed_field_dropped_individually() {
        let patch: PlaybackPatch =
            serde_json::from_str(r#"{"played": "abc", "playing": true, "unknown": 1}"#).unwrap();
        assert_eq!(patch.played, None);
        assert_eq!(patch.playing, Some(true));
    }

    #[test]
    fn test_drift_uses_local_duration_and_rate() {
        let state = PlaybackState {
            played: 0.5,
            duration: 100.0,
            playback_rate: 2.0,
            ..Default::default()
        };
        assert!((state.drift_secs(0.51) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_has_ended() {
        let state = PlaybackState {
            played: 0.995,
            duration: 100.0,
            playing: false,
            ..Default::default()
        };
        assert!(state.has_ended());

        let playing = PlaybackState {
            playing: true,
            ..state.clone()
        };
        assert!(!playing.has_ended());

        let midway = PlaybackState {
            played: 0.5,
            ..state
        };
        assert!(!midway.has_ended());
    }

    #[test]
    fn test_wire_part_and_emptiness() {
        let patch = PlaybackPatch {
            ready: Some(true),
            ..Default::default()
        };
        assert!(!patch.has_wire_fields());
        assert!(!patch.is_empty());
        assert!(patch.wire_part().is_empty());
    }
}
