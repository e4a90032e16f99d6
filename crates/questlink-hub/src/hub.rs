//! The hub: registry of connected peers plus the broadcast primitive.
//!
//! # Concurrency note
//!
//! `Hub` is NOT thread-safe by itself; it uses plain `HashMap`s. The
//! server wraps it in a `tokio::sync::Mutex` and passes an `Arc` of that
//! to every connection handler. Every method is synchronous and never
//! touches the network (delivery goes through per-peer queues), so the
//! lock is never held across I/O.

use std::collections::HashMap;

use questlink_protocol::Envelope;
use questlink_transport::ConnectionId;
use tokio::sync::mpsc;

use crate::{HubError, Peer, PeerSender, Relayed};

/// Registry of connected peers, keyed by name.
///
/// ## Lifecycle of a peer
///
/// ```text
/// identity envelope ──→ register() ──→ broadcast()… ──→ unregister()
///                           │                  │
///                           ▼                  ▼ (queue closed)
///                       NameTaken           removed
/// ```
#[derive(Default)]
pub struct Hub {
    /// Registered peers, keyed by their unique name.
    peers: HashMap<String, Peer>,

    /// Index from connection to name, kept in sync with `peers`.
    /// Handlers know their connection id, not necessarily their name.
    names: HashMap<ConnectionId, String>,

    /// In-process listeners that see every relayed envelope.
    listeners: Vec<mpsc::UnboundedSender<Relayed>>,
}

impl Hub {
    /// Creates an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` for the connection `conn_id`.
    ///
    /// Check and insert happen under the same `&mut self`, so two handlers
    /// racing for one name cannot both win.
    ///
    /// # Errors
    /// - [`HubError::NameTaken`] if a live peer holds `name`
    /// - [`HubError::AlreadyRegistered`] if `conn_id` already registered
    pub fn register(
        &mut self,
        name: &str,
        conn_id: ConnectionId,
        sender: PeerSender,
    ) -> Result<(), HubError> {
        if self.names.contains_key(&conn_id) {
            return Err(HubError::AlreadyRegistered(conn_id));
        }
        if self.peers.contains_key(name) {
            return Err(HubError::NameTaken(name.to_string()));
        }

        self.names.insert(conn_id, name.to_string());
        self.peers.insert(
            name.to_string(),
            Peer {
                name: name.to_string(),
                conn_id,
                sender,
            },
        );

        tracing::info!(%conn_id, name, "peer registered");
        Ok(())
    }

    /// Removes the peer attached to `conn_id`. Idempotent.
    ///
    /// Returns the name it was registered under, if any.
    pub fn unregister(&mut self, conn_id: ConnectionId) -> Option<String> {
        let name = self.names.remove(&conn_id)?;
        self.peers.remove(&name);
        tracing::info!(%conn_id, %name, "peer unregistered");
        Some(name)
    }

    /// Delivers `envelope` to every registered peer except `exclude`, and
    /// to every in-process listener.
    ///
    /// Delivery is independent per peer: a peer whose queue is closed is
    /// removed and delivery to the rest goes on. Returns the names of the
    /// peers removed this way.
    pub fn broadcast(
        &mut self,
        envelope: &Envelope,
        exclude: ConnectionId,
    ) -> Vec<String> {
        let mut gone = Vec::new();

        for peer in self.peers.values() {
            if peer.conn_id == exclude {
                continue;
            }
            if !peer.deliver(envelope.clone()) {
                gone.push(peer.conn_id);
            }
        }

        let removed: Vec<String> = gone
            .into_iter()
            .filter_map(|conn_id| self.unregister(conn_id))
            .collect();
        for name in &removed {
            tracing::warn!(%name, "dropped peer with closed queue during broadcast");
        }

        if let Some(origin) = self.name_of(exclude).map(str::to_owned) {
            self.listeners.retain(|listener| {
                listener
                    .send(Relayed {
                        origin: origin.clone(),
                        envelope: envelope.clone(),
                    })
                    .is_ok()
            });
        }

        removed
    }

    /// Delivers `envelope` to the single peer named `name`.
    ///
    /// Used by in-process collaborators answering a request.
    ///
    /// # Errors
    /// - [`HubError::UnknownPeer`] if nobody holds `name`
    /// - [`HubError::PeerGone`] if the peer's queue was closed (it is
    ///   removed)
    pub fn send_to(&mut self, name: &str, envelope: Envelope) -> Result<(), HubError> {
        let peer = self
            .peers
            .get(name)
            .ok_or_else(|| HubError::UnknownPeer(name.to_string()))?;

        if peer.deliver(envelope) {
            return Ok(());
        }
        let conn_id = peer.conn_id;
        self.unregister(conn_id);
        Err(HubError::PeerGone(name.to_string()))
    }

    /// Attaches an in-process listener that receives every envelope
    /// relayed by a registered peer. Dropping the receiver detaches it.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Relayed> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.push(tx);
        rx
    }

    /// Returns `true` if a peer holds `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.peers.contains_key(name)
    }

    /// Returns the name registered for `conn_id`.
    pub fn name_of(&self, conn_id: ConnectionId) -> Option<&str> {
        self.names.get(&conn_id).map(String::as_str)
    }

    /// Returns the registered names, sorted.
    pub fn peer_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.peers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of registered peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Returns `true` if no peer is registered.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `Hub`, named `test_{function}_{scenario}_{expected}`.
    //!
    //! Peers are plain channels here: a dropped receiver stands in for a
    //! handler whose socket write failed.

    use questlink_protocol::{MessageType, Purpose};
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;

    // -- Helpers ----------------------------------------------------------

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    /// Registers `name` on `conn(id)` and returns the peer's inbox.
    fn join(hub: &mut Hub, name: &str, id: u64) -> UnboundedReceiver<Envelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        hub.register(name, conn(id), tx).expect("register should succeed");
        rx
    }

    fn chat(sender: &str) -> Envelope {
        Envelope::new(sender, MessageType::Chat, Purpose::Message)
    }

    // =====================================================================
    // register()
    // =====================================================================

    #[test]
    fn test_register_new_name_succeeds() {
        let mut hub = Hub::new();
        let _rx = join(&mut hub, "Alice", 1);

        assert!(hub.contains("Alice"));
        assert_eq!(hub.name_of(conn(1)), Some("Alice"));
        assert_eq!(hub.len(), 1);
    }

    #[test]
    fn test_register_taken_name_returns_name_taken() {
        let mut hub = Hub::new();
        let _rx = join(&mut hub, "Alice", 1);

        let (tx, _rx2) = mpsc::unbounded_channel();
        let result = hub.register("Alice", conn(2), tx);

        assert!(
            matches!(result, Err(HubError::NameTaken(ref n)) if n == "Alice"),
            "should reject duplicate name, got {result:?}"
        );
        assert_eq!(hub.len(), 1);
        assert_eq!(hub.name_of(conn(2)), None);
    }

    #[test]
    fn test_register_name_free_again_after_unregister() {
        let mut hub = Hub::new();
        let _rx = join(&mut hub, "Alice", 1);
        hub.unregister(conn(1));

        let (tx, _rx2) = mpsc::unbounded_channel();
        hub.register("Alice", conn(2), tx)
            .expect("name should be free after the holder left");
        assert_eq!(hub.name_of(conn(2)), Some("Alice"));
    }

    #[test]
    fn test_register_same_connection_twice_returns_error() {
        let mut hub = Hub::new();
        let _rx = join(&mut hub, "Alice", 1);

        let (tx, _rx2) = mpsc::unbounded_channel();
        let result = hub.register("Bob", conn(1), tx);

        assert!(matches!(result, Err(HubError::AlreadyRegistered(c)) if c == conn(1)));
        assert!(!hub.contains("Bob"));
    }

    // =====================================================================
    // unregister()
    // =====================================================================

    #[test]
    fn test_unregister_is_idempotent() {
        let mut hub = Hub::new();
        let _rx = join(&mut hub, "Alice", 1);

        assert_eq!(hub.unregister(conn(1)).as_deref(), Some("Alice"));
        assert_eq!(hub.unregister(conn(1)), None);
        assert!(hub.is_empty());
    }

    // =====================================================================
    // broadcast()
    // =====================================================================

    #[test]
    fn test_broadcast_skips_excluded_peer() {
        let mut hub = Hub::new();
        let mut alice = join(&mut hub, "Alice", 1);
        let mut bob = join(&mut hub, "Bob", 2);
        let mut carol = join(&mut hub, "Carol", 3);

        let env = chat("Alice");
        let removed = hub.broadcast(&env, conn(1));

        assert!(removed.is_empty());
        assert_eq!(bob.try_recv().unwrap(), env);
        assert_eq!(carol.try_recv().unwrap(), env);
        assert!(alice.try_recv().is_err(), "sender must not get its own message");
    }

    #[test]
    fn test_broadcast_failed_peer_removed_others_still_receive() {
        let mut hub = Hub::new();
        let _alice = join(&mut hub, "Alice", 1);
        let bob = join(&mut hub, "Bob", 2);
        let mut carol = join(&mut hub, "Carol", 3);
        drop(bob); // Bob's handler is gone.

        let env = chat("Alice");
        let removed = hub.broadcast(&env, conn(1));

        assert_eq!(removed, vec!["Bob".to_string()]);
        assert!(!hub.contains("Bob"));
        assert_eq!(carol.try_recv().unwrap(), env);
        assert_eq!(hub.peer_names(), vec!["Alice", "Carol"]);
    }

    #[test]
    fn test_broadcast_preserves_per_sender_order() {
        let mut hub = Hub::new();
        let _alice = join(&mut hub, "Alice", 1);
        let mut bob = join(&mut hub, "Bob", 2);

        let sent: Vec<Envelope> = (0..5).map(|_| chat("Alice")).collect();
        for env in &sent {
            hub.broadcast(env, conn(1));
        }

        for env in &sent {
            assert_eq!(bob.try_recv().unwrap().id(), env.id());
        }
    }

    #[test]
    fn test_broadcast_reaches_listener_with_origin() {
        let mut hub = Hub::new();
        let _alice = join(&mut hub, "Alice", 1);
        let mut listener = hub.subscribe();

        let env = chat("Alice");
        hub.broadcast(&env, conn(1));

        let relayed = listener.try_recv().expect("listener should see it");
        assert_eq!(relayed.origin, "Alice");
        assert_eq!(relayed.envelope, env);
    }

    #[test]
    fn test_broadcast_drops_closed_listener() {
        let mut hub = Hub::new();
        let _alice = join(&mut hub, "Alice", 1);
        drop(hub.subscribe());

        hub.broadcast(&chat("Alice"), conn(1));

        assert!(hub.listeners.is_empty());
    }

    // =====================================================================
    // send_to()
    // =====================================================================

    #[test]
    fn test_send_to_known_peer_delivers() {
        let mut hub = Hub::new();
        let mut bob = join(&mut hub, "Bob", 2);

        let env = chat("SERVER");
        hub.send_to("Bob", env.clone()).unwrap();

        assert_eq!(bob.try_recv().unwrap(), env);
    }

    #[test]
    fn test_send_to_unknown_peer_returns_error() {
        let mut hub = Hub::new();
        let result = hub.send_to("Nobody", chat("SERVER"));
        assert!(matches!(result, Err(HubError::UnknownPeer(_))));
    }

    #[test]
    fn test_send_to_closed_peer_removes_it() {
        let mut hub = Hub::new();
        drop(join(&mut hub, "Bob", 2));

        let result = hub.send_to("Bob", chat("SERVER"));

        assert!(matches!(result, Err(HubError::PeerGone(_))));
        assert!(hub.is_empty());
    }
}
