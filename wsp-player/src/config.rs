//! Player configuration
//!
//! Resolved once at startup from command-line arguments, environment and the
//! shared TOML file.

use crate::error::{Error, Result};
use crate::reconciler::PlayerOptions;
use crate::transport::ws;
use wsp_common::config::{RelayConfig, SyncSettings};
use wsp_common::protocol::is_valid_room_id;

/// Everything the headless player needs to join a room
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Relay base url, `ws://` or `wss://`
    pub server_url: String,
    pub room_id: String,
    pub options: PlayerOptions,
    pub sync: SyncSettings,
    /// Length of every media item in the simulated element
    pub media_duration_secs: f64,
}

impl PlayerConfig {
    /// WebSocket url of the configured room
    pub fn room_url(&self) -> String {
        ws::room_url(&self.server_url, &self.room_id)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.server_url.starts_with("ws://") || self.server_url.starts_with("wss://")) {
            return Err(Error::Config(format!(
                "server url must start with ws:// or wss://, got {}",
                self.server_url
            )));
        }
        if !is_valid_room_id(&self.room_id) {
            return Err(Error::Config(format!("invalid room id: {:?}", self.room_id)));
        }
        if !(self.media_duration_secs.is_finite() && self.media_duration_secs > 0.0) {
            return Err(Error::Config(
                "media duration must be a positive number of seconds".to_string(),
            ));
        }
        self.sync.validate()?;
        Ok(())
    }
}

/// Relay url a player uses when none is given
///
/// A wildcard bind address is reached through loopback.
pub fn default_server_url(relay: &RelayConfig) -> String {
    let host = match relay.host.as_str() {
        "0.0.0.0" | "::" | "" => "127.0.0.1",
        host => host,
    };
    format!("ws://{}:{}", host, relay.port)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PlayerConfig {
        PlayerConfig {
            server_url: "ws://127.0.0.1:5780".to_string(),
            room_id: "movie-night".to_string(),
            options: PlayerOptions::default(),
            sync: SyncSettings::default(),
            media_duration_secs: 180.0,
        }
    }

    #[test]
    fn test_valid_config() {
        let config = config();
        assert!(config.validate().is_ok());
        assert_eq!(config.room_url(), "ws://127.0.0.1:5780/rooms/movie-night/ws");
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut bad_scheme = config();
        bad_scheme.server_url = "http://localhost".to_string();
        assert!(bad_scheme.validate().is_err());

        let mut bad_room = config();
        bad_room.room_id = "a/b".to_string();
        assert!(bad_room.validate().is_err());

        let mut bad_duration = config();
        bad_duration.media_duration_secs = 0.0;
        assert!(bad_duration.validate().is_err());
    }

    #[test]
    fn test_default_server_url() {
        let relay = RelayConfig::default();
        assert_eq!(
            default_server_url(&relay),
            format!("ws://127.0.0.1:{}", relay.port)
        );

        let named = RelayConfig {
            host: "relay.local".to_string(),
            port: 9000,
        };
        assert_eq!(default_server_url(&named), "ws://relay.local:9000");
    }
}
