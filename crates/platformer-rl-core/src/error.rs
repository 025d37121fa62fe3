//! Error types for the platformer RL bridge

use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Fatal or propagated bridge errors. Expected absences (world not loaded,
/// no player yet) are `Option`s at the query sites, never variants here.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Agent missed the action deadline; the session is unrecoverable
    #[error("action retrieval timed out after {waited_ms}ms")]
    ActionTimeout { waited_ms: u64 },

    /// Episode started with a zero distance to target
    #[error("original distance from target is zero; waypoint state is corrupt")]
    EpisodeCorrupt,

    /// The waypoint graph produced an impossible target
    #[error("waypoint graph error: {0}")]
    WaypointGraph(String),

    /// The peer side of a channel is gone
    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O failure reading a seed file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed seed file or action script
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Parse(err.to_string())
    }
}
