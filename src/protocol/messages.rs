//! Messages for the live-session endpoint.
//!
//! All messages are serialized as JSON over WebSocket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Open a new live session for a quiz.
    Host { quiz_id: String, host_name: String },

    /// Join a session by PIN as a guest.
    Join { pin: String, nickname: String },

    /// Look a session up by PIN.
    Lookup { pin: String },

    /// Close a session this connection hosts.
    Close { pin: String },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Connection accepted.
    ConnectionAck,

    /// Session created.
    Hosted { session: SessionSummary },

    /// Nickname accepted into the session.
    Joined {
        pin: String,
        quiz_id: String,
        player_id: Uuid,
        nickname: String,
    },

    /// Current state of a session.
    Session { session: SessionSummary },

    /// Session closed; no further joins.
    Closed { pin: String },

    /// Request rejected.
    Error { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveStatus {
    Open,
    Closed,
}

/// Public view of a live session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub pin: String,
    pub quiz_id: String,
    pub host: String,
    pub players: Vec<String>,
    pub status: LiveStatus,
    pub created_at: DateTime<Utc>,
}

/// Nickname validation constants.
pub const NICKNAME_MIN_LENGTH: usize = 3;
pub const NICKNAME_MAX_LENGTH: usize = 16;

/// Default server port.
pub const DEFAULT_PORT: u16 = 8712;

/// Validates a guest nickname. Length is counted in characters after trimming.
pub fn validate_nickname(nickname: &str) -> Result<(), &'static str> {
    let length = nickname.trim().chars().count();

    if length < NICKNAME_MIN_LENGTH {
        return Err("Nickname must be at least 3 characters");
    }

    if length > NICKNAME_MAX_LENGTH {
        return Err("Nickname must be at most 16 characters");
    }

    Ok(())
}
