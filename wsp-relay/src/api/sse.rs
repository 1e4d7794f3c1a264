//! Server-Sent Events (SSE) observer stream
//!
//! Streams every frame relayed in a room, for dashboards and debugging.
//! Observers are not members: they get no snapshot frame and don't keep the
//! room alive. The stream ends when the room closes.

use super::handlers::validate_room_id;
use super::AppContext;
use crate::error::Result;
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

/// GET /rooms/:room_id/events
pub async fn room_events(
    State(ctx): State<AppContext>,
    Path(room_id): Path<String>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    validate_room_id(&room_id)?;
    let rx = ctx.registry.observe(&room_id).await?;
    debug!("SSE observer attached to room {}", room_id);

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(frame) => match frame.message.to_json() {
                Ok(json) => Some(Ok(Event::default()
                    .event(frame.message.event_name())
                    .data(json))),
                Err(e) => {
                    warn!("Failed to serialize frame: {}", e);
                    None
                }
            },
            Err(e) => {
                // Lagged observer: frames were skipped
                warn!("SSE stream error: {:?}", e);
                None
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}
