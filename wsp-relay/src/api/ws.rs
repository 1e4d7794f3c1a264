//! Room WebSocket endpoint
//!
//! Each connection is one room member. On connect the member receives the
//! merged room snapshot; afterwards every frame it sends is merged into the
//! room and forwarded to all other members, never back to the sender.
//!
//! A member whose sender task falls behind the room's fan-out channel gets a
//! fresh snapshot in place of the frames it missed.

use super::handlers::validate_room_id;
use super::AppContext;
use crate::rooms::{RelayFrame, RoomRegistry};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::{IntoResponse, Response},
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use uuid::Uuid;
use wsp_common::protocol::{ClientMessage, ServerMessage};

/// GET /rooms/:room_id/ws
pub async fn room_socket(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    State(ctx): State<AppContext>,
) -> Response {
    if let Err(e) = validate_room_id(&room_id) {
        return e.into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, room_id, ctx.registry))
}

async fn handle_socket(socket: WebSocket, room_id: String, registry: Arc<RoomRegistry>) {
    let membership = registry.join(&room_id).await;
    let member_id = membership.member_id;
    let (mut sink, stream) = socket.split();

    if let Err(e) = send(&mut sink, &ServerMessage::Snapshot(membership.snapshot)).await {
        warn!("Failed to send snapshot to {}: {}", member_id, e);
        registry.leave(&room_id, member_id).await;
        return;
    }

    let mut send_task = tokio::spawn(sender_task(
        sink,
        membership.frames,
        member_id,
        room_id.clone(),
        Arc::clone(&registry),
    ));
    let mut recv_task = tokio::spawn(receiver_task(
        stream,
        member_id,
        room_id.clone(),
        Arc::clone(&registry),
    ));

    // Whichever side finishes first ends the membership
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    registry.leave(&room_id, member_id).await;
}

/// Forward room frames to this member, skipping its own
async fn sender_task(
    mut sink: SplitSink<WebSocket, Message>,
    mut frames: broadcast::Receiver<RelayFrame>,
    member_id: Uuid,
    room_id: String,
    registry: Arc<RoomRegistry>,
) {
    loop {
        let message = match frames.recv().await {
            Ok(frame) if frame.sender == member_id => continue,
            Ok(frame) => frame.message,
            Err(RecvError::Lagged(skipped)) => {
                warn!(
                    "Member {} lagged by {} frames, resending snapshot",
                    member_id, skipped
                );
                match registry.snapshot(&room_id).await {
                    Ok(snapshot) => ServerMessage::Snapshot(snapshot),
                    Err(_) => break,
                }
            }
            Err(RecvError::Closed) => break,
        };

        if let Err(e) = send(&mut sink, &message).await {
            debug!("Send to {} failed: {}", member_id, e);
            break;
        }
    }

    debug!("Sender task for {} terminated", member_id);
}

/// Merge and fan out frames sent by this member
async fn receiver_task(
    mut stream: SplitStream<WebSocket>,
    member_id: Uuid,
    room_id: String,
    registry: Arc<RoomRegistry>,
) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match ClientMessage::from_json(&text) {
                Ok(message) => {
                    if let Err(e) = registry.publish(&room_id, member_id, message).await {
                        warn!("Dropping frame from {}: {}", member_id, e);
                    }
                }
                Err(e) => warn!("Dropping malformed frame from {}: {}", member_id, e),
            },
            Ok(Message::Close(_)) => {
                info!("Member {} closed the connection", member_id);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                debug!("WebSocket error from {}: {}", member_id, e);
                break;
            }
        }
    }

    debug!("Receiver task for {} terminated", member_id);
}

async fn send(
    sink: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> anyhow::Result<()> {
    let text = message.to_json()?;
    sink.send(Message::Text(text)).await?;
    Ok(())
}
