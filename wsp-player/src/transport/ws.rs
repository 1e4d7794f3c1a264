//! WebSocket transport to a relay
//!
//! One sender task drains the adapter's outbound channel into the socket, one
//! receiver task decodes frames into the inbound channel. Either task ends
//! when the socket closes; the session notices through the closed inbound
//! channel.

use super::{decode_inbound, Connection, TransportAdapter};
use crate::error::{Error, Result};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use wsp_common::protocol::{ClientMessage, ServerMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Relay url of a room's WebSocket endpoint
pub fn room_url(server: &str, room_id: &str) -> String {
    format!("{}/rooms/{}/ws", server.trim_end_matches('/'), room_id)
}

/// Connect to a room and start the transport tasks
pub async fn connect(url: &str) -> Result<Connection> {
    info!("Connecting to relay: {}", url);

    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|e| Error::Transport(format!("Failed to connect to {}: {}", url, e)))?;

    info!("Connected to relay");

    let (write, read) = ws_stream.split();
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (in_tx, in_rx) = mpsc::unbounded_channel();

    tokio::spawn(sender_task(write, out_rx));
    tokio::spawn(receiver_task(read, in_tx));

    Ok(Connection {
        adapter: TransportAdapter::new(out_tx),
        inbound: in_rx,
    })
}

async fn sender_task(
    mut write: SplitSink<WsStream, Message>,
    mut rx: mpsc::UnboundedReceiver<ClientMessage>,
) {
    while let Some(message) = rx.recv().await {
        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to encode frame: {}", e);
                continue;
            }
        };
        if let Err(e) = write.send(Message::Text(text)).await {
            error!("Failed to send WebSocket message: {}", e);
            break;
        }
    }

    if let Err(e) = write.close().await {
        debug!("WebSocket close: {}", e);
    }
    debug!("Sender task terminated");
}

async fn receiver_task(mut read: SplitStream<WsStream>, tx: mpsc::UnboundedSender<ServerMessage>) {
    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if let Some(message) = decode_inbound(&text) {
                    if tx.send(message).is_err() {
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => {
                info!("Relay closed the connection");
                break;
            }
            Err(e) => {
                error!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    debug!("Receiver task terminated");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_url() {
        assert_eq!(
            room_url("ws://127.0.0.1:5780/", "movie-night"),
            "ws://127.0.0.1:5780/rooms/movie-night/ws"
        );
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Port 1 is never a relay
        let result = connect("ws://127.0.0.1:1/rooms/x/ws").await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
