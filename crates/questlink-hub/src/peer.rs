//! Peer types: what the hub knows about one connected player.

use questlink_protocol::Envelope;
use questlink_transport::ConnectionId;
use tokio::sync::mpsc;

/// Outbound queue of one peer.
///
/// The connection handler owns the receiving end and drains it to the
/// socket. Unbounded so a broadcast never waits on a slow peer; a closed
/// queue means the handler is gone.
pub type PeerSender = mpsc::UnboundedSender<Envelope>;

/// A registered peer.
#[derive(Debug)]
pub struct Peer {
    /// The name the peer announced in its identity envelope.
    pub name: String,

    /// The server-side connection this peer is attached to.
    pub conn_id: ConnectionId,

    pub(crate) sender: PeerSender,
}

impl Peer {
    /// Queues `envelope` for this peer. Returns `false` if the handler's
    /// queue is closed.
    pub(crate) fn deliver(&self, envelope: Envelope) -> bool {
        self.sender.send(envelope).is_ok()
    }
}

/// An envelope relayed through the hub, as seen by an in-process listener.
#[derive(Debug, Clone)]
pub struct Relayed {
    /// Registered name of the peer whose handler relayed it.
    pub origin: String,
    pub envelope: Envelope,
}
