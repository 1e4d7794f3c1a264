//! Error types for wsp-relay

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for the relay
#[derive(Debug, Error)]
pub enum Error {
    /// No room with this id currently exists
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    /// Room id not usable in a url path
    #[error("Invalid room id: {0}")]
    InvalidRoomId(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] wsp_common::Error),
}

/// Convenience Result type using wsp-relay Error
pub type Result<T> = std::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            Error::RoomNotFound(_) => (StatusCode::NOT_FOUND, "ROOM_NOT_FOUND"),
            Error::InvalidRoomId(_) => (StatusCode::BAD_REQUEST, "INVALID_ROOM_ID"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            Error::Common(_) => (StatusCode::INTERNAL_SERVER_ERROR, "COMMON_ERROR"),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
