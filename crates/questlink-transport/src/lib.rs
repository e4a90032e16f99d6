//! Connections between game clients and the Questlink relay.
//!
//! A game client keeps one persistent connection open to the relay for its
//! whole session. This crate only moves whole messages over it, in order
//! and without loss. Envelopes, correlation and retries live in the crates
//! above.
//!
//! - [`Transport`]: the listening side, used by the relay's accept loop
//! - [`Connection`]: one open link, used by both relay and client
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Process-unique handle for one open connection.
///
/// The relay keys its peer registry on it, so a peer can be found again
/// before (and after) it has a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The listening side: hands out one [`Connection`] per player that dials
/// in.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next player to connect.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;
}

/// One open link carrying whole messages.
///
/// `send` and `recv` may be called concurrently from different tasks:
/// a task parked in `recv` must not hold up a sender.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Sends one message.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Waits for the next message.
    ///
    /// `Ok(None)` means the other side closed the connection cleanly.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Starts a clean close; the other side's `recv` then yields `None`.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_keys_registry() {
        use std::collections::HashMap;
        let mut names = HashMap::new();
        names.insert(ConnectionId::new(1), "Alice");
        names.insert(ConnectionId::new(2), "Bob");
        assert_eq!(names[&ConnectionId::new(1)], "Alice");
        assert_eq!(names.len(), 2);
    }
}
