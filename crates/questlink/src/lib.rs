//! # Questlink
//!
//! Networking layer for small multiplayer board games.
//!
//! A [`QuestlinkServer`] relays every envelope a player sends to all the
//! other players. Each game client holds one
//! [`ClientSession`](questlink_client::ClientSession) that correlates
//! requests with replies, retries what went unanswered, and hands pushed
//! notifications to subscribers. Game rules live in the clients (or in an
//! in-process host reached through [`HubHandle`]); the relay never
//! interprets what it forwards.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use questlink::prelude::*;
//!
//! # async fn run() -> Result<(), QuestlinkError> {
//! let server = QuestlinkServer::builder().bind("0.0.0.0:27093").build().await?;
//! tokio::spawn(server.run());
//!
//! let alice = ClientSession::connect(ClientConfig::new("127.0.0.1:27093", "Alice")).await?;
//! alice.send_chat("hello").await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::QuestlinkError;
pub use server::{
    DEFAULT_IDENTITY_TIMEOUT, HubHandle, QuestlinkServer, QuestlinkServerBuilder,
};

pub use questlink_client as client;
pub use questlink_hub as hub;
pub use questlink_protocol as protocol;
pub use questlink_transport as transport;

pub mod prelude {
    pub use crate::{HubHandle, QuestlinkError, QuestlinkServer};
    pub use questlink_client::{ClientConfig, ClientError, ClientSession};
    pub use questlink_hub::Relayed;
    pub use questlink_protocol::{
        ACK_NAME_TAKEN, ACK_OK, Codec, ContentKind, DEFAULT_PORT, Envelope,
        EnvelopeContent, JsonCodec, MessageType, Purpose, RouteKey,
        SERVER_SENDER,
    };
}
