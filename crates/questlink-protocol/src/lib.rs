//! Wire protocol for Questlink.
//!
//! This crate defines the "language" game clients and the relay server
//! speak:
//!
//! - **Envelope** ([`Envelope`]): the single message structure on the wire.
//! - **Routing keys** ([`MessageType`], [`Purpose`], [`RouteKey`]): what an
//!   envelope is about, used for dispatch on the receiving side.
//! - **Content** ([`ContentKind`], [`EnvelopeContent`]): the tag and trait
//!   that make the opaque payload safely decodable.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how values become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the client
//! session / server hub. It knows nothing about connections or peers.
//!
//! ```text
//! Transport (frames) → Protocol (Envelope) → Client Session / Hub
//! ```

mod codec;
mod content;
mod error;
mod route;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use content::{ContentKind, EnvelopeContent};
pub use error::ProtocolError;
pub use route::{MessageType, Purpose, RouteKey};
pub use types::{
    ACK_NAME_TAKEN, ACK_OK, DEFAULT_PORT, Envelope, SERVER_SENDER,
};
pub use uuid::Uuid;
