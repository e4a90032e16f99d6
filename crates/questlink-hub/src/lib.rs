//! Peer registry for the Questlink relay server.
//!
//! This crate knows who is connected and how to reach them:
//!
//! 1. **Registration**: a peer's first envelope names it; names are unique
//!    among live peers ([`Hub::register`])
//! 2. **Broadcast**: relay one envelope to everyone but its originator
//!    ([`Hub::broadcast`])
//! 3. **Listeners**: in-process game logic can watch relayed traffic and
//!    answer a peer directly ([`Hub::subscribe`], [`Hub::send_to`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Connection handlers (above)  ← one per socket, feed envelopes in
//!     ↕
//! Hub (this crate)  ← names → outbound queues
//!     ↕
//! Protocol (below)  ← Envelope
//! ```

mod error;
mod hub;
mod peer;

pub use error::HubError;
pub use hub::Hub;
pub use peer::{Peer, PeerSender, Relayed};
