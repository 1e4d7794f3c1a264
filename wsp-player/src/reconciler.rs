//! Playback state reconciler
//!
//! Merges local gestures, media element callbacks and peer updates into one
//! [`PlaybackState`] and decides what has to happen as a consequence:
//! what to broadcast to the room and which imperative commands the media
//! element needs.
//!
//! Each operation replaces the current state with a new snapshot and returns
//! a [`Transition`]. The reconciler never talks to the transport or the
//! element itself; the owning session executes the transition.
//!
//! **Drift correction:** a peer-reported `played` is only adopted when the
//! local position is more than `drift_threshold_secs` away from it, measured
//! in seconds of the local media at the local rate, and no local interaction
//! is in flight. Small drift is left alone so peers don't keep nudging each
//! other.

use crate::boundary::PlayerProps;
use tracing::{debug, info};
use wsp_common::config::SyncSettings;
use wsp_common::model::{PlaybackPatch, PlaybackState, QueueState};
use wsp_common::protocol::{RoomSnapshot, UpdateMessage};

/// Player variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerOptions {
    /// The core renders its own controls; false means the element's native
    /// controls are shown and user scrubbing is only seen as a seek callback
    pub show_controls: bool,
    /// Running inside an embedding host that wants update notifications
    pub embedded: bool,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            show_controls: true,
            embedded: false,
        }
    }
}

/// Imperative command for the media element
#[derive(Debug, Clone, PartialEq)]
pub enum MediaCommand {
    /// Jump to a fraction of the local duration
    Seek { fraction: f64 },
    /// A new url is being loaded
    Load { url: String },
}

/// Outcome of a drift check
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resync {
    /// Local position replaced by the peer's
    Corrected {
        from_played: f64,
        to_played: f64,
        drift_secs: f64,
    },
    /// Over threshold, but a local interaction was in flight
    Suppressed { drift_secs: f64 },
    /// Within threshold, local position kept
    InSync { drift_secs: f64 },
}

/// What to do when the media reached its end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndAction {
    /// Looping: play the same media from the start
    Restart,
    /// Play the queue entry at this index
    Advance(usize),
    /// Nothing left to play
    Stop,
}

/// Result of one reconciler operation
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// State after the operation
    pub state: PlaybackState,
    /// Update to broadcast to the room, if any
    pub outbound: Option<UpdateMessage>,
    pub commands: Vec<MediaCommand>,
    pub resync: Option<Resync>,
}

impl Transition {
    fn unchanged(state: &PlaybackState) -> Self {
        Self {
            state: state.clone(),
            outbound: None,
            commands: Vec::new(),
            resync: None,
        }
    }
}

/// Playback state reconciler for one room membership
#[derive(Debug, Clone)]
pub struct Reconciler {
    state: PlaybackState,
    options: PlayerOptions,
    drift_threshold_secs: f64,
    default_volume: f64,
    /// Room position to apply once the freshly loaded media knows its duration
    pending_position: Option<f64>,
}

impl Reconciler {
    pub fn new(options: PlayerOptions, settings: &SyncSettings) -> Self {
        Self {
            state: PlaybackState {
                volume: settings.default_volume,
                ..Default::default()
            },
            options,
            drift_threshold_secs: settings.drift_threshold_secs,
            default_volume: settings.default_volume,
            pending_position: None,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn options(&self) -> PlayerOptions {
        self.options
    }

    pub fn pending_position(&self) -> Option<f64> {
        self.pending_position
    }

    /// Declarative props for the media element
    pub fn props(&self) -> PlayerProps {
        PlayerProps {
            url: self.state.url.clone(),
            playing: self.state.playing,
            looping: self.state.looping,
            playback_rate: self.state.playback_rate,
            volume: self.state.volume,
            muted: self.state.muted,
            controls: !self.options.show_controls,
        }
    }

    /// Apply a local change and broadcast its room-visible part
    ///
    /// A `played` field also seeks the element.
    pub fn apply_local(&mut self, patch: PlaybackPatch, interaction: bool) -> Transition {
        self.local(patch, interaction, true)
    }

    /// Apply a peer's update
    ///
    /// Volume, mute, duration and transient fields of the patch are ignored.
    /// Nothing is broadcast.
    pub fn on_remote(&mut self, patch: PlaybackPatch, interaction_active: bool) -> Transition {
        let mut patch = patch.sanitized().without_volume().wire_part();
        patch.duration = None;
        let remote_played = patch.played.take();

        let mut next = self.state.merged(&patch);
        let mut commands = Vec::new();
        if self.load_path(&patch, &mut next, &mut commands) {
            return self.commit(next, None, commands, None);
        }

        let resync = remote_played.map(|remote| {
            let drift_secs = self.state.drift_secs(remote);
            if drift_secs <= self.drift_threshold_secs {
                Resync::InSync { drift_secs }
            } else if interaction_active {
                debug!(
                    "Drift {:.2}s over threshold, correction suppressed by interaction",
                    drift_secs
                );
                Resync::Suppressed { drift_secs }
            } else {
                info!(
                    "Resync: drift {:.2}s, seeking {:.4} -> {:.4}",
                    drift_secs, self.state.played, remote
                );
                next.played = remote;
                commands.push(MediaCommand::Seek { fraction: remote });
                Resync::Corrected {
                    from_played: self.state.played,
                    to_played: remote,
                    drift_secs,
                }
            }
        });

        self.commit(next, None, commands, resync)
    }

    /// Replace the playback state with the room snapshot received on join
    pub fn on_snapshot(&mut self, snapshot: &RoomSnapshot, interaction_active: bool) -> Transition {
        let switching = snapshot.url != self.state.url;
        let transition = self.on_remote(snapshot.playback_patch(), interaction_active);
        if switching && snapshot.played > 0.0 && snapshot.played.is_finite() {
            self.pending_position = Some(snapshot.played.min(1.0));
            debug!("Room position {:.4} pending until duration is known", snapshot.played);
        }
        transition
    }

    /// Periodic position report from the element
    ///
    /// Ignored while the element is seeking. Broadcasts `played` but never
    /// seeks: the element is already there.
    pub fn on_progress(&mut self, played: f64, loaded: f64, interaction: bool) -> Transition {
        if self.state.seeking {
            return Transition::unchanged(&self.state);
        }
        let patch = PlaybackPatch {
            played: Some(played),
            loaded: Some(loaded),
            ..Default::default()
        };
        if self.pending_position.is_some() {
            // Our position is meaningless until the room position is applied
            return self.quiet(patch);
        }
        self.local(patch, interaction, false)
    }

    /// Element reported the media duration
    pub fn on_duration(&mut self, duration: f64, interaction: bool) -> Transition {
        let patch = PlaybackPatch {
            duration: Some(duration),
            ..Default::default()
        }
        .sanitized();
        let mut next = self.state.merged(&patch);
        let mut commands = Vec::new();
        let mut resync = None;

        if next.duration > 0.0 {
            if let Some(position) = self.pending_position.take() {
                let drift_secs =
                    (next.played - position).abs() * next.duration * next.playback_rate;
                info!("Applying room position {:.4} after load", position);
                resync = Some(Resync::Corrected {
                    from_played: next.played,
                    to_played: position,
                    drift_secs,
                });
                next.played = position;
                commands.push(MediaCommand::Seek { fraction: position });
            }
        }

        let outbound = patch
            .has_wire_fields()
            .then(|| UpdateMessage::new(patch.wire_part(), interaction));
        self.commit(next, outbound, commands, resync)
    }

    /// Element started or paused playback
    ///
    /// An element confirming the state we already hold (usually because a
    /// peer asked for it) is not broadcast again.
    pub fn on_play_state(&mut self, playing: bool, interaction: bool) -> Transition {
        if self.state.playing == playing {
            return Transition::unchanged(&self.state);
        }
        self.local(PlaybackPatch::playing(playing), interaction, false)
    }

    /// Merge a patch that stays on this client: no broadcast, no commands
    pub fn quiet(&mut self, patch: PlaybackPatch) -> Transition {
        let patch = patch.sanitized();
        let next = self.state.merged(&patch);
        self.commit(next, None, Vec::new(), None)
    }

    /// Decide what follows the end of the media
    pub fn on_ended(&self, queue: &QueueState) -> EndAction {
        if self.state.looping {
            return EndAction::Restart;
        }
        let next = queue.queue_index.map_or(0, |i| i + 1);
        if next < queue.queue.len() {
            EndAction::Advance(next)
        } else {
            EndAction::Stop
        }
    }

    /// Play/pause button: restarts media that already ended
    pub fn toggle_play(&mut self, interaction: bool) -> Transition {
        let patch = if self.state.has_ended() {
            PlaybackPatch::restart()
        } else {
            PlaybackPatch::playing(!self.state.playing)
        };
        self.apply_local(patch, interaction)
    }

    /// Local volume change; a positive volume unmutes
    pub fn set_volume(&mut self, volume: f64) -> Transition {
        let mut patch = PlaybackPatch {
            volume: Some(volume),
            ..Default::default()
        }
        .sanitized();
        if self.state.muted && patch.volume.is_some_and(|v| v > 0.0) {
            patch.muted = Some(false);
        }
        self.quiet(patch)
    }

    /// Local mute toggle; unmuting at zero volume restores the default volume
    pub fn toggle_mute(&mut self) -> Transition {
        let patch = if self.state.volume <= 0.0 {
            PlaybackPatch {
                muted: Some(false),
                volume: Some(self.default_volume),
                ..Default::default()
            }
        } else {
            PlaybackPatch {
                muted: Some(!self.state.muted),
                ..Default::default()
            }
        };
        self.quiet(patch)
    }

    fn local(&mut self, patch: PlaybackPatch, interaction: bool, seek: bool) -> Transition {
        let patch = patch.sanitized();
        let mut next = self.state.merged(&patch);
        let mut commands = Vec::new();
        let loading = self.load_path(&patch, &mut next, &mut commands);
        if seek && !loading {
            if let Some(fraction) = patch.played {
                if next.duration > 0.0 {
                    commands.push(MediaCommand::Seek { fraction });
                } else {
                    // Element cannot place a fraction before it knows the duration
                    debug!("Seek to {:.4} pending until duration is known", fraction);
                    self.pending_position = Some(fraction);
                }
            }
        }

        let wire = patch.wire_part();
        let outbound = wire
            .has_wire_fields()
            .then(|| UpdateMessage::new(wire, interaction));
        self.commit(next, outbound, commands, None)
    }

    /// Reset position and readiness when the patch switches media
    fn load_path(
        &mut self,
        patch: &PlaybackPatch,
        next: &mut PlaybackState,
        commands: &mut Vec<MediaCommand>,
    ) -> bool {
        match &patch.url {
            Some(url) if *url != self.state.url => {
                next.ready = false;
                next.played = 0.0;
                next.duration = 0.0;
                next.loaded = 0.0;
                self.pending_position = None;
                info!("Loading media: {}", url);
                commands.push(MediaCommand::Load { url: url.clone() });
                true
            }
            _ => false,
        }
    }

    fn commit(
        &mut self,
        next: PlaybackState,
        outbound: Option<UpdateMessage>,
        commands: Vec<MediaCommand>,
        resync: Option<Resync>,
    ) -> Transition {
        self.state = next.clone();
        Transition {
            state: next,
            outbound,
            commands,
            resync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconciler() -> Reconciler {
        Reconciler::new(PlayerOptions::default(), &SyncSettings::default())
    }

    /// Reconciler playing `url` with a known 100s duration at `played`
    fn playing_at(played: f64) -> Reconciler {
        let mut r = reconciler();
        r.apply_local(PlaybackPatch::load("a.mp4"), false);
        r.on_duration(100.0, false);
        r.quiet(PlaybackPatch::seek(played));
        r
    }

    #[test]
    fn test_initial_state() {
        let r = reconciler();
        assert_eq!(r.state().volume, 0.3);
        assert!(r.state().muted);
        assert!(!r.state().playing);
        assert_eq!(r.state().playback_rate, 1.0);
    }

    #[test]
    fn test_drift_over_threshold_corrects() {
        let mut r = playing_at(0.50);
        // 0.03 * 100s = 3s
        let t = r.on_remote(PlaybackPatch::seek(0.53), false);

        assert_eq!(r.state().played, 0.53);
        assert_eq!(t.commands, vec![MediaCommand::Seek { fraction: 0.53 }]);
        assert!(matches!(t.resync, Some(Resync::Corrected { .. })));
        assert!(t.outbound.is_none());
    }

    #[test]
    fn test_drift_within_threshold_keeps_position() {
        let mut r = playing_at(0.50);
        // 0.01 * 100s = 1s
        let t = r.on_remote(PlaybackPatch::seek(0.51), false);

        assert_eq!(r.state().played, 0.50);
        assert!(t.commands.is_empty());
        assert!(matches!(t.resync, Some(Resync::InSync { .. })));
    }

    #[test]
    fn test_drift_scaled_by_rate() {
        let mut r = playing_at(0.50);
        r.quiet(PlaybackPatch {
            playback_rate: Some(2.0),
            ..Default::default()
        });
        // 0.015 * 100s * 2 = 3s
        let t = r.on_remote(PlaybackPatch::seek(0.515), false);
        assert!(matches!(t.resync, Some(Resync::Corrected { .. })));
    }

    #[test]
    fn test_active_interaction_suppresses_correction() {
        let mut r = playing_at(0.20);
        let t = r.on_remote(PlaybackPatch::seek(0.80), true);

        assert_eq!(r.state().played, 0.20);
        assert!(t.commands.is_empty());
        assert!(matches!(t.resync, Some(Resync::Suppressed { .. })));
    }

    #[test]
    fn test_remote_played_is_clamped() {
        let mut r = playing_at(0.10);
        r.on_remote(PlaybackPatch::seek(1.7), false);
        assert_eq!(r.state().played, 1.0);
    }

    #[test]
    fn test_remote_volume_and_duration_ignored() {
        let mut r = playing_at(0.5);
        r.on_remote(
            PlaybackPatch {
                volume: Some(1.0),
                muted: Some(false),
                duration: Some(5.0),
                playing: Some(true),
                ..Default::default()
            },
            false,
        );
        assert_eq!(r.state().volume, 0.3);
        assert!(r.state().muted);
        assert_eq!(r.state().duration, 100.0);
        assert!(r.state().playing);
    }

    #[test]
    fn test_remote_url_runs_load_path() {
        let mut r = playing_at(0.5);
        let t = r.on_remote(
            PlaybackPatch {
                url: Some("b.mp4".into()),
                played: Some(0.9),
                ..Default::default()
            },
            false,
        );

        assert_eq!(r.state().url, "b.mp4");
        assert_eq!(r.state().played, 0.0);
        assert_eq!(r.state().duration, 0.0);
        assert!(!r.state().ready);
        assert_eq!(
            t.commands,
            vec![MediaCommand::Load {
                url: "b.mp4".into()
            }]
        );
        assert!(t.resync.is_none());
    }

    #[test]
    fn test_local_update_broadcasts_wire_part_only() {
        let mut r = reconciler();
        let t = r.apply_local(
            PlaybackPatch {
                playing: Some(true),
                ready: Some(true),
                ..Default::default()
            },
            true,
        );

        let outbound = t.outbound.unwrap();
        assert!(outbound.interaction);
        assert_eq!(outbound.patch.playing, Some(true));
        assert_eq!(outbound.patch.ready, None);
        assert!(r.state().ready);

        let t = r.apply_local(
            PlaybackPatch {
                buffering: Some(true),
                ..Default::default()
            },
            false,
        );
        assert!(t.outbound.is_none());
    }

    #[test]
    fn test_local_seek_commands_element() {
        let mut r = playing_at(0.1);
        let t = r.apply_local(PlaybackPatch::seek(0.6), true);
        assert_eq!(t.commands, vec![MediaCommand::Seek { fraction: 0.6 }]);
        assert_eq!(t.outbound.unwrap().patch.played, Some(0.6));
    }

    #[test]
    fn test_local_seek_before_duration_waits_for_load() {
        let mut r = reconciler();
        r.apply_local(PlaybackPatch::load("a.mp4"), false);

        let t = r.apply_local(PlaybackPatch::seek(0.5), true);
        assert!(t.commands.is_empty());
        assert_eq!(t.outbound.unwrap().patch.played, Some(0.5));
        assert_eq!(r.pending_position(), Some(0.5));

        let t = r.on_duration(100.0, false);
        assert_eq!(t.commands, vec![MediaCommand::Seek { fraction: 0.5 }]);
        assert_eq!(r.state().played, 0.5);
        assert!(r.pending_position().is_none());
    }

    #[test]
    fn test_progress_broadcasts_without_seek() {
        let mut r = playing_at(0.1);
        let t = r.on_progress(0.12, 0.5, false);
        assert!(t.commands.is_empty());
        let outbound = t.outbound.unwrap();
        assert_eq!(outbound.patch.played, Some(0.12));
        assert_eq!(outbound.patch.loaded, None);
        assert_eq!(r.state().loaded, 0.5);
    }

    #[test]
    fn test_progress_ignored_while_seeking() {
        let mut r = playing_at(0.1);
        r.quiet(PlaybackPatch {
            seeking: Some(true),
            ..Default::default()
        });
        let t = r.on_progress(0.9, 1.0, false);
        assert!(t.outbound.is_none());
        assert_eq!(r.state().played, 0.1);
    }

    #[test]
    fn test_confirming_play_state_not_rebroadcast() {
        let mut r = playing_at(0.1);
        assert!(r.state().playing);
        assert!(r.on_play_state(true, false).outbound.is_none());
        let t = r.on_play_state(false, false);
        assert_eq!(t.outbound.unwrap().patch.playing, Some(false));
    }

    #[test]
    fn test_on_ended_actions() {
        let mut r = playing_at(1.0);
        let queue = QueueState {
            queue: vec!["a".into(), "b".into(), "c".into()],
            queue_index: Some(0),
        };
        assert_eq!(r.on_ended(&queue), EndAction::Advance(1));

        let last = QueueState {
            queue_index: Some(2),
            ..queue.clone()
        };
        assert_eq!(r.on_ended(&last), EndAction::Stop);

        let unset = QueueState {
            queue_index: None,
            ..queue.clone()
        };
        assert_eq!(r.on_ended(&unset), EndAction::Advance(0));
        assert_eq!(r.on_ended(&QueueState::default()), EndAction::Stop);

        r.apply_local(
            PlaybackPatch {
                looping: Some(true),
                ..Default::default()
            },
            false,
        );
        assert_eq!(r.on_ended(&last), EndAction::Restart);
    }

    #[test]
    fn test_toggle_play_restarts_ended_media() {
        let mut r = playing_at(0.995);
        r.apply_local(PlaybackPatch::playing(false), false);
        assert!(r.state().has_ended());

        let t = r.toggle_play(true);
        assert!(r.state().playing);
        assert_eq!(r.state().played, 0.0);
        assert_eq!(t.commands, vec![MediaCommand::Seek { fraction: 0.0 }]);
    }

    #[test]
    fn test_toggle_play_flips() {
        let mut r = playing_at(0.5);
        r.toggle_play(true);
        assert!(!r.state().playing);
        r.toggle_play(true);
        assert!(r.state().playing);
    }

    #[test]
    fn test_volume_is_local_only() {
        let mut r = reconciler();
        let t = r.set_volume(0.8);
        assert!(t.outbound.is_none());
        assert_eq!(r.state().volume, 0.8);
        assert!(!r.state().muted);

        assert!(r.toggle_mute().outbound.is_none());
        assert!(r.state().muted);
    }

    #[test]
    fn test_unmute_at_zero_volume_restores_default() {
        let mut r = reconciler();
        r.set_volume(0.0);
        assert!(r.state().muted);
        r.toggle_mute();
        assert!(!r.state().muted);
        assert_eq!(r.state().volume, 0.3);
    }

    #[test]
    fn test_snapshot_position_applied_after_duration() {
        let mut r = reconciler();
        let snapshot = RoomSnapshot {
            url: "a.mp4".into(),
            playing: true,
            played: 0.4,
            ..Default::default()
        };

        r.on_snapshot(&snapshot, false);
        assert_eq!(r.state().played, 0.0);
        assert_eq!(r.pending_position(), Some(0.4));
        // Progress before the room position is applied stays local
        assert!(r.on_progress(0.01, 0.1, false).outbound.is_none());

        let t = r.on_duration(200.0, false);
        assert_eq!(r.state().played, 0.4);
        assert_eq!(t.commands, vec![MediaCommand::Seek { fraction: 0.4 }]);
        assert!(r.pending_position().is_none());
    }

    #[test]
    fn test_native_controls_prop() {
        let r = Reconciler::new(
            PlayerOptions {
                show_controls: false,
                embedded: true,
            },
            &SyncSettings::default(),
        );
        assert!(r.props().controls);
        assert!(!reconciler().props().controls);
    }
}
