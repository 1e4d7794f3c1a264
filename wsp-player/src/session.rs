//! Room session
//!
//! One room membership: owns the reconciler, queue manager, interaction
//! guard, transport adapter and media element, and runs every transition on
//! a single task. Presentation layers talk to a running session through a
//! [`SessionHandle`] and observe it through the [`EventBus`].
//!
//! **Event loop inputs:**
//! - Frames from the relay (snapshot, peer updates, peer queues)
//! - Commands from the presentation layer
//! - Media element callbacks (pushed, or polled on the progress cadence)
//! - Interaction guard expiry
//! - Shutdown

use crate::boundary::{MediaElement, MediaEvent};
use crate::error::{Error, Result};
use crate::guard::InteractionGuard;
use crate::queue_manager::QueueManager;
use crate::reconciler::{EndAction, MediaCommand, PlayerOptions, Reconciler, Resync, Transition};
use crate::transport::TransportAdapter;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use wsp_common::config::SyncSettings;
use wsp_common::events::{EndOutcome, EventBus, QueueChangeTrigger, RoomEvent};
use wsp_common::model::{index_to_wire, PlaybackPatch, PlaybackState, QueueState};
use wsp_common::protocol::ServerMessage;
use wsp_common::time;

/// Room event channel capacity
const EVENT_CAPACITY: usize = 256;

/// Operation requested by a presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    UpdateState(PlaybackPatch),
    Seek(f64),
    TogglePlay,
    SetVolume(f64),
    ToggleMute,
    Play(String),
    PlayFromQueue(usize),
    PlayNext,
    PlayPrevious,
    AddToQueue(String),
    DeleteFromQueue(usize),
    SwapQueueItems(usize, usize),
}

/// Receiving ends consumed by [`RoomSession::run`]
pub struct SessionInputs {
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    media_events: mpsc::UnboundedReceiver<MediaEvent>,
}

/// Cloneable handle for driving a running session
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    media_events: mpsc::UnboundedSender<MediaEvent>,
}

impl SessionHandle {
    pub fn channel() -> (Self, SessionInputs) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (media_tx, media_rx) = mpsc::unbounded_channel();
        (
            Self {
                commands: commands_tx,
                media_events: media_tx,
            },
            SessionInputs {
                commands: commands_rx,
                media_events: media_rx,
            },
        )
    }

    pub fn send(&self, command: SessionCommand) -> Result<()> {
        self.commands.send(command).map_err(|_| Error::SessionClosed)
    }

    /// Forward a callback from an element that pushes its events
    pub fn media_event(&self, event: MediaEvent) -> Result<()> {
        self.media_events
            .send(event)
            .map_err(|_| Error::SessionClosed)
    }

    pub fn seek(&self, fraction: f64) -> Result<()> {
        self.send(SessionCommand::Seek(fraction))
    }

    pub fn toggle_play(&self) -> Result<()> {
        self.send(SessionCommand::TogglePlay)
    }

    pub fn play(&self, url: impl Into<String>) -> Result<()> {
        self.send(SessionCommand::Play(url.into()))
    }

    pub fn play_from_queue(&self, index: usize) -> Result<()> {
        self.send(SessionCommand::PlayFromQueue(index))
    }

    pub fn add_to_queue(&self, url: impl Into<String>) -> Result<()> {
        self.send(SessionCommand::AddToQueue(url.into()))
    }

    pub fn delete_from_queue(&self, index: usize) -> Result<()> {
        self.send(SessionCommand::DeleteFromQueue(index))
    }

    pub fn swap_queue_items(&self, i: usize, j: usize) -> Result<()> {
        self.send(SessionCommand::SwapQueueItems(i, j))
    }
}

/// Synchronization core of one room membership
pub struct RoomSession<E: MediaElement> {
    reconciler: Reconciler,
    queue: QueueManager,
    guard: InteractionGuard,
    transport: TransportAdapter,
    element: E,
    events: EventBus,
    progress_interval: Duration,
    /// A seek we commanded has not been confirmed by the element yet
    awaiting_seek: bool,
    /// The relay's join snapshot has been applied
    joined: bool,
}

impl<E: MediaElement> RoomSession<E> {
    pub fn new(
        options: PlayerOptions,
        settings: &SyncSettings,
        transport: TransportAdapter,
        element: E,
    ) -> Self {
        if options.embedded && !transport.has_embed_host() {
            warn!("Embedded player started without an embed host");
        }
        let mut session = Self {
            reconciler: Reconciler::new(options, settings),
            queue: QueueManager::new(),
            guard: InteractionGuard::new(settings.interaction_window()),
            transport,
            element,
            events: EventBus::new(EVENT_CAPACITY),
            progress_interval: settings.progress_interval(),
            awaiting_seek: false,
            joined: false,
        };
        let props = session.reconciler.props();
        session.element.render(&props);
        session
    }

    pub fn state(&self) -> &PlaybackState {
        self.reconciler.state()
    }

    pub fn queue(&self) -> &QueueState {
        self.queue.state()
    }

    pub fn element(&self) -> &E {
        &self.element
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    pub fn joined(&self) -> bool {
        self.joined
    }

    pub fn interaction_active(&self) -> bool {
        self.guard.is_active(Instant::now())
    }

    // ========================================
    // Playback operations
    // ========================================

    /// Apply and broadcast a local playback change
    pub fn update_state(&mut self, patch: PlaybackPatch) {
        let interaction = self.interaction_active();
        let transition = self.reconciler.apply_local(patch, interaction);
        self.execute(transition);
    }

    /// User scrubbed to `fraction`
    pub fn seek(&mut self, fraction: f64) {
        self.guard.begin(Instant::now());
        self.update_state(PlaybackPatch::seek(fraction));
    }

    pub fn toggle_play(&mut self) {
        self.guard.begin(Instant::now());
        let transition = self.reconciler.toggle_play(true);
        self.execute(transition);
    }

    pub fn set_volume(&mut self, volume: f64) {
        let transition = self.reconciler.set_volume(volume);
        self.execute(transition);
    }

    pub fn toggle_mute(&mut self) {
        let transition = self.reconciler.toggle_mute();
        self.execute(transition);
    }

    // ========================================
    // Queue operations
    // ========================================

    /// Play a url outside the queue
    pub fn play(&mut self, url: impl Into<String>) {
        let patch = self.queue.play(url);
        self.update_state(patch);
        self.publish_queue(QueueChangeTrigger::PlayDirect);
    }

    pub fn play_from_queue(&mut self, index: usize) -> bool {
        let Some(patch) = self.queue.play_from_queue(index) else {
            debug!("Ignoring play_from_queue({}): out of range", index);
            return false;
        };
        self.update_state(patch);
        self.publish_queue(QueueChangeTrigger::PlayFromQueue);
        true
    }

    pub fn play_next(&mut self) -> bool {
        match self.queue.next_index() {
            Some(next) => self.play_from_queue(next),
            None => false,
        }
    }

    pub fn play_previous(&mut self) -> bool {
        match self.queue.previous_index() {
            Some(previous) => self.play_from_queue(previous),
            None => false,
        }
    }

    pub fn add_to_queue(&mut self, url: impl Into<String>) {
        self.queue.add(url);
        self.publish_queue(QueueChangeTrigger::Add);
    }

    pub fn delete_from_queue(&mut self, index: usize) -> bool {
        if !self.queue.delete_at(index) {
            debug!("Ignoring delete_from_queue({}): out of range", index);
            return false;
        }
        self.publish_queue(QueueChangeTrigger::Delete);
        true
    }

    pub fn swap_queue_items(&mut self, i: usize, j: usize) -> bool {
        if !self.queue.swap(i, j) {
            debug!("Ignoring swap_queue_items({}, {})", i, j);
            return false;
        }
        self.publish_queue(QueueChangeTrigger::Swap);
        true
    }

    // ========================================
    // Inputs
    // ========================================

    pub fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::UpdateState(patch) => self.update_state(patch),
            SessionCommand::Seek(fraction) => self.seek(fraction),
            SessionCommand::TogglePlay => self.toggle_play(),
            SessionCommand::SetVolume(volume) => self.set_volume(volume),
            SessionCommand::ToggleMute => self.toggle_mute(),
            SessionCommand::Play(url) => self.play(url),
            SessionCommand::PlayFromQueue(index) => {
                self.play_from_queue(index);
            }
            SessionCommand::PlayNext => {
                self.play_next();
            }
            SessionCommand::PlayPrevious => {
                self.play_previous();
            }
            SessionCommand::AddToQueue(url) => self.add_to_queue(url),
            SessionCommand::DeleteFromQueue(index) => {
                self.delete_from_queue(index);
            }
            SessionCommand::SwapQueueItems(i, j) => {
                self.swap_queue_items(i, j);
            }
        }
    }

    pub fn handle_media_event(&mut self, event: MediaEvent) {
        let interaction = self.interaction_active();
        let transition = match event {
            MediaEvent::Ready => self.reconciler.quiet(PlaybackPatch {
                ready: Some(true),
                ..Default::default()
            }),
            MediaEvent::Play => self.reconciler.on_play_state(true, interaction),
            MediaEvent::Pause => self.reconciler.on_play_state(false, interaction),
            MediaEvent::Buffer => self.reconciler.quiet(PlaybackPatch {
                buffering: Some(true),
                ..Default::default()
            }),
            MediaEvent::BufferEnd => self.reconciler.quiet(PlaybackPatch {
                buffering: Some(false),
                ..Default::default()
            }),
            MediaEvent::Progress { played, loaded } => {
                self.reconciler.on_progress(played, loaded, interaction)
            }
            MediaEvent::Duration(duration) => self.reconciler.on_duration(duration, interaction),
            MediaEvent::SeekStart => self.reconciler.quiet(PlaybackPatch {
                seeking: Some(true),
                ..Default::default()
            }),
            MediaEvent::Seeked => {
                if self.awaiting_seek {
                    self.awaiting_seek = false;
                } else if !self.reconciler.options().show_controls {
                    // User scrubbed the native controls
                    self.guard.begin(Instant::now());
                }
                self.reconciler.quiet(PlaybackPatch {
                    seeking: Some(false),
                    ..Default::default()
                })
            }
            MediaEvent::Ended => {
                self.handle_ended();
                return;
            }
            MediaEvent::Error(message) => {
                warn!("Media error: {}", message);
                self.events.emit_lossy(RoomEvent::MediaError {
                    message,
                    timestamp: time::now(),
                });
                return;
            }
        };
        self.execute(transition);
    }

    pub fn handle_server_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Snapshot(snapshot) => {
                info!(
                    "Joined room: url={:?} playing={} queue={} entries",
                    snapshot.url,
                    snapshot.playing,
                    snapshot.queue.len()
                );
                self.queue.apply_remote(&snapshot.queue_patch());
                let interaction = self.interaction_active();
                let transition = self.reconciler.on_snapshot(&snapshot, interaction);
                self.execute(transition);
                self.emit_queue_changed(QueueChangeTrigger::Remote);
                self.joined = true;
            }
            ServerMessage::Update(update) => {
                debug!("Peer update (interaction={})", update.interaction);
                let interaction = self.interaction_active();
                let transition = self.reconciler.on_remote(update.patch, interaction);
                self.execute(transition);
            }
            ServerMessage::Queue(patch) => {
                self.queue.apply_remote(&patch);
                self.emit_queue_changed(QueueChangeTrigger::Remote);
            }
        }
    }

    /// Disarm the interaction guard if its window has elapsed
    pub fn expire_guard(&mut self, now: Instant) {
        if self.guard.expire(now) {
            self.events.emit_lossy(RoomEvent::GuardExpired {
                timestamp: time::now(),
            });
        }
    }

    /// Collect and handle callbacks from a polled element
    pub fn poll_element(&mut self, now: Instant) {
        for event in self.element.poll(now) {
            self.handle_media_event(event);
        }
    }

    /// Run the session until shutdown or until the relay connection closes
    ///
    /// Commands wait until the join snapshot has been applied, so the
    /// snapshot cannot overwrite changes this client already broadcast.
    /// Returns the session so callers can inspect its final state.
    pub async fn run<F>(
        mut self,
        mut inbound: mpsc::UnboundedReceiver<ServerMessage>,
        inputs: SessionInputs,
        shutdown: F,
    ) -> Self
    where
        F: Future<Output = ()>,
    {
        let SessionInputs {
            mut commands,
            mut media_events,
        } = inputs;
        tokio::pin!(shutdown);

        let mut ticker = tokio::time::interval(self.progress_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Room session started");
        loop {
            let deadline = self.guard.deadline();
            let joined = self.joined;
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Room session shutting down");
                    break;
                }
                message = inbound.recv() => match message {
                    Some(message) => self.handle_server_message(message),
                    None => {
                        warn!("Relay connection closed");
                        break;
                    }
                },
                Some(command) = commands.recv(), if joined => self.handle_command(command),
                Some(event) = media_events.recv() => self.handle_media_event(event),
                _ = ticker.tick() => self.poll_element(Instant::now()),
                _ = sleep_until_deadline(deadline) => self.expire_guard(Instant::now()),
            }
        }
        self
    }

    fn handle_ended(&mut self) {
        let outcome = match self.reconciler.on_ended(self.queue.state()) {
            EndAction::Restart => {
                self.update_state(PlaybackPatch::restart());
                EndOutcome::Restarted
            }
            EndAction::Advance(next) => {
                self.play_from_queue(next);
                EndOutcome::Advanced
            }
            EndAction::Stop => {
                self.update_state(PlaybackPatch::playing(false));
                EndOutcome::Stopped
            }
        };
        info!("Media ended: {}", outcome);
        self.events.emit_lossy(RoomEvent::PlaybackEnded {
            outcome,
            timestamp: time::now(),
        });
    }

    fn execute(&mut self, transition: Transition) {
        let Transition {
            state,
            outbound,
            commands,
            resync,
        } = transition;

        if let Some(update) = outbound {
            if let Err(e) = self.transport.send_message(update) {
                warn!("Update not sent: {}", e);
            }
        }

        let props = self.reconciler.props();
        self.element.render(&props);

        for command in commands {
            match command {
                MediaCommand::Seek { fraction } => {
                    self.awaiting_seek = true;
                    self.element
                        .seek_to(time::fraction_to_secs(fraction, state.duration));
                }
                MediaCommand::Load { url } => {
                    // New media drops any seek confirmation still in flight
                    self.awaiting_seek = false;
                    self.events.emit_lossy(RoomEvent::MediaLoaded {
                        url,
                        timestamp: time::now(),
                    });
                }
            }
        }

        match resync {
            Some(Resync::Corrected {
                from_played,
                to_played,
                drift_secs,
            }) => self.events.emit_lossy(RoomEvent::Resynced {
                from_played,
                to_played,
                drift_secs,
                timestamp: time::now(),
            }),
            Some(Resync::Suppressed { drift_secs }) => {
                self.events.emit_lossy(RoomEvent::ResyncSuppressed {
                    drift_secs,
                    timestamp: time::now(),
                })
            }
            Some(Resync::InSync { .. }) | None => {}
        }

        self.events.emit_lossy(RoomEvent::StateChanged {
            state,
            timestamp: time::now(),
        });
    }

    fn publish_queue(&mut self, trigger: QueueChangeTrigger) {
        if let Err(e) = self.transport.send_queue(self.queue.snapshot()) {
            warn!("Queue not sent: {}", e);
        }
        self.emit_queue_changed(trigger);
    }

    fn emit_queue_changed(&self, trigger: QueueChangeTrigger) {
        let state = self.queue.state();
        self.events.emit_lossy(RoomEvent::QueueChanged {
            queue: state.queue.clone(),
            queue_index: index_to_wire(state.queue_index),
            trigger,
            timestamp: time::now(),
        });
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
