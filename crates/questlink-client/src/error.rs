//! Error types for the client session.

use questlink_protocol::{ProtocolError, RouteKey};

/// Errors surfaced to the game and GUI layers.
///
/// Each failure a player can recover from has its own variant so the
/// caller can pick the right action: retry the connection, choose another
/// name, or give up.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server could not be reached within the configured attempts.
    #[error("could not connect to {addr} after {attempts} attempt(s): {reason}")]
    ConnectFailed {
        addr: String,
        attempts: u32,
        reason: String,
    },

    /// The server rejected the proposed name; reconnect with another one.
    #[error("name {0:?} is already taken")]
    NameTaken(String),

    /// No correlated reply arrived, even after resending.
    #[error("no answer to {route} after {attempts} attempt(s)")]
    Timeout { route: RouteKey, attempts: u32 },

    /// The session is closed, or the connection dropped while waiting.
    #[error("session disconnected")]
    Disconnected,

    /// Encoding a request or decoding a reply's content failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
