//! HTTP request handlers

use super::AppContext;
use crate::error::{Error, Result};
use crate::rooms::RoomSummary;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use wsp_common::protocol::{is_valid_room_id, RoomSnapshot};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    rooms: usize,
}

#[derive(Debug, Serialize)]
pub struct RoomListResponse {
    rooms: Vec<RoomSummary>,
}

/// GET /health
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "relay".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        rooms: ctx.registry.room_count().await,
    })
}

/// GET /rooms
pub async fn list_rooms(State(ctx): State<AppContext>) -> Json<RoomListResponse> {
    Json(RoomListResponse {
        rooms: ctx.registry.summaries().await,
    })
}

/// GET /rooms/:room_id - merged room snapshot
pub async fn get_room(
    State(ctx): State<AppContext>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomSnapshot>> {
    validate_room_id(&room_id)?;
    Ok(Json(ctx.registry.snapshot(&room_id).await?))
}

pub(crate) fn validate_room_id(room_id: &str) -> Result<()> {
    if is_valid_room_id(room_id) {
        Ok(())
    } else {
        Err(Error::InvalidRoomId(room_id.to_string()))
    }
}
