//! HTTP API
//!
//! | Route                     | Purpose                                  |
//! |---------------------------|------------------------------------------|
//! | `GET /health`             | Liveness and room count                  |
//! | `GET /rooms`              | Summaries of live rooms                  |
//! | `GET /rooms/:room_id`     | Merged snapshot of one room              |
//! | `GET /rooms/:room_id/ws`  | Join the room over WebSocket             |
//! | `GET /rooms/:room_id/events` | Observe relayed frames as SSE         |

pub mod handlers;
pub mod sse;
pub mod ws;

use crate::rooms::RoomRegistry;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub registry: Arc<RoomRegistry>,
}

impl AppContext {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }
}

/// Build the relay router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/rooms", get(handlers::list_rooms))
        .route("/rooms/:room_id", get(handlers::get_room))
        .route("/rooms/:room_id/ws", get(ws::room_socket))
        .route("/rooms/:room_id/events", get(sse::room_events))
        .with_state(ctx)
        // Players may be served from any origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
