//! Transport adapter
//!
//! Turns core decisions into channel frames and channel frames into core
//! inputs. The adapter is fire-and-forget: there are no acknowledgements and
//! the core never waits on delivery.
//!
//! Outbound frames go into an unbounded channel drained by the concrete
//! transport (see [`ws`]); inbound frames arrive on the matching receiver.
//! When the player is embedded, every outbound playback update is also
//! posted to the embedding host.

pub mod ws;

use crate::error::{Error, Result};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, trace, warn};
use wsp_common::model::{PlaybackPatch, QueuePatch};
use wsp_common::protocol::{ClientMessage, EmbedNotification, ServerMessage, UpdateMessage};

/// Receiver of one-way notifications for an embedding host
pub trait EmbedHost: Send {
    fn post_message(&self, notification: &EmbedNotification) -> Result<()>;
}

/// Embed host that republishes notifications on a broadcast channel
#[derive(Clone)]
pub struct ChannelEmbedHost {
    tx: broadcast::Sender<EmbedNotification>,
}

impl ChannelEmbedHost {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EmbedNotification> {
        self.tx.subscribe()
    }
}

impl EmbedHost for ChannelEmbedHost {
    fn post_message(&self, notification: &EmbedNotification) -> Result<()> {
        self.tx
            .send(notification.clone())
            .map(|_| ())
            .map_err(|_| Error::EmbedHost("no listener".to_string()))
    }
}

/// Sending half of a room connection
pub struct TransportAdapter {
    outbound: mpsc::UnboundedSender<ClientMessage>,
    embed: Option<Box<dyn EmbedHost>>,
}

impl TransportAdapter {
    pub fn new(outbound: mpsc::UnboundedSender<ClientMessage>) -> Self {
        Self {
            outbound,
            embed: None,
        }
    }

    /// In-process adapter: returns the adapter and the receiver of its frames
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ClientMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Also post every playback update to `host`
    pub fn with_embed_host(mut self, host: Box<dyn EmbedHost>) -> Self {
        self.embed = Some(host);
        self
    }

    pub fn has_embed_host(&self) -> bool {
        self.embed.is_some()
    }

    /// Send a playback merge-patch to the room
    pub fn send_update(&self, patch: PlaybackPatch, interaction: bool) -> Result<()> {
        self.send_message(UpdateMessage::new(patch, interaction))
    }

    /// Send an already tagged update to the room
    pub fn send_message(&self, update: UpdateMessage) -> Result<()> {
        if let Some(host) = &self.embed {
            if let Err(e) = host.post_message(&EmbedNotification::new(update.clone())) {
                trace!("Embed notification not delivered: {}", e);
            }
        }
        debug!("Sending update (interaction={})", update.interaction);
        self.outbound
            .send(ClientMessage::Update(update))
            .map_err(|_| Error::TransportClosed)
    }

    /// Send the full queue to the room
    pub fn send_queue(&self, patch: QueuePatch) -> Result<()> {
        debug!(
            "Sending queue: {} entries, index {}",
            patch.queue.len(),
            patch.queue_index
        );
        self.outbound
            .send(ClientMessage::Queue(patch))
            .map_err(|_| Error::TransportClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

/// Both halves of a room connection
pub struct Connection {
    pub adapter: TransportAdapter,
    pub inbound: mpsc::UnboundedReceiver<ServerMessage>,
}

/// Decode an inbound frame, logging and dropping malformed ones
pub fn decode_inbound(text: &str) -> Option<ServerMessage> {
    match ServerMessage::from_json(text) {
        Ok(message) => {
            trace!("Received {} frame", message.event_name());
            Some(message)
        }
        Err(e) => {
            warn!("Dropping malformed frame: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_update_frame() {
        let (adapter, mut rx) = TransportAdapter::channel();
        adapter.send_update(PlaybackPatch::seek(0.5), true).unwrap();

        match rx.try_recv().unwrap() {
            ClientMessage::Update(update) => {
                assert_eq!(update.patch.played, Some(0.5));
                assert!(update.interaction);
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_send_queue_frame() {
        let (adapter, mut rx) = TransportAdapter::channel();
        adapter
            .send_queue(QueuePatch {
                queue: vec!["a".into()],
                queue_index: 0,
            })
            .unwrap();
        assert!(matches!(rx.try_recv().unwrap(), ClientMessage::Queue(q) if q.queue_index == 0));
    }

    #[test]
    fn test_closed_channel_is_an_error() {
        let (adapter, rx) = TransportAdapter::channel();
        drop(rx);
        assert!(adapter.is_closed());
        assert!(matches!(
            adapter.send_update(PlaybackPatch::playing(true), false),
            Err(Error::TransportClosed)
        ));
    }

    #[test]
    fn test_embed_host_receives_updates_only() {
        let host = ChannelEmbedHost::new(8);
        let mut notifications = host.subscribe();
        let (adapter, _rx) = TransportAdapter::channel();
        let adapter = adapter.with_embed_host(Box::new(host));

        adapter.send_update(PlaybackPatch::playing(true), false).unwrap();
        adapter.send_queue(QueuePatch::default()).unwrap();

        let notification = notifications.try_recv().unwrap();
        assert!(notification.is_trusted());
        assert_eq!(notification.data.patch.playing, Some(true));
        assert!(notifications.try_recv().is_err());
    }

    #[test]
    fn test_embed_failure_does_not_block_room() {
        // No subscriber: posting fails, the room frame still goes out
        let host = ChannelEmbedHost::new(8);
        let (adapter, mut rx) = TransportAdapter::channel();
        let adapter = adapter.with_embed_host(Box::new(host));

        adapter.send_update(PlaybackPatch::playing(false), false).unwrap();
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_decode_inbound_drops_garbage() {
        assert!(decode_inbound("not json").is_none());
        assert!(decode_inbound(r#"{"event":"bogus","data":{}}"#).is_none());
        let frame = r#"{"event":"update","data":{"playing":true}}"#;
        assert!(matches!(decode_inbound(frame), Some(ServerMessage::Update(_))));
    }
}
