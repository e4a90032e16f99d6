//! Error types for the hub.

use questlink_transport::ConnectionId;

/// Errors that can occur while registering or addressing peers.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Another live peer already holds this name.
    /// The connection handler answers the proposing peer with a rejecting
    /// `CONNEXION/NAME` reply.
    #[error("name {0:?} is already taken")]
    NameTaken(String),

    /// This connection already registered under another name.
    #[error("{0} is already registered")]
    AlreadyRegistered(ConnectionId),

    /// No peer is registered under this name.
    #[error("no peer named {0:?}")]
    UnknownPeer(String),

    /// The peer's outbound queue was closed; it has been removed.
    #[error("peer {0:?} is gone")]
    PeerGone(String),
}
