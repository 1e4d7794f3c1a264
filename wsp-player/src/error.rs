//! Error types for wsp-player
//!
//! Core operations are total and never fail; errors only surface at the
//! transport edge and during startup.

use thiserror::Error;

/// Main error type for the player
#[derive(Error, Debug)]
pub enum Error {
    /// Shared model, protocol or config error
    #[error(transparent)]
    Common(#[from] wsp_common::Error),

    /// Connecting to or talking with the relay failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Outbound channel has no receiver anymore
    #[error("Transport closed")]
    TransportClosed,

    /// Room session task has stopped
    #[error("Session closed")]
    SessionClosed,

    /// Embedding host refused a notification
    #[error("Embed host error: {0}")]
    EmbedHost(String),

    /// Invalid configuration or arguments
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience Result type using wsp-player Error
pub type Result<T> = std::result::Result<T, Error>;
