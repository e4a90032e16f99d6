//! Client session for Questlink.
//!
//! A game client opens one [`ClientSession`] to the relay server and shares
//! it between every task that needs the network:
//!
//! ```text
//! GUI / game logic   ← request(), notify(), subscribe(), typed helpers
//!     ↕
//! ClientSession (this crate)  ← correlation ids, retries, dispatch
//!     ↕
//! Protocol + Transport (below)  ← Envelope over one WebSocket
//! ```
//!
//! ```rust,no_run
//! use questlink_client::{ClientConfig, ClientSession};
//!
//! # async fn run() -> Result<(), questlink_client::ClientError> {
//! let session = ClientSession::connect(ClientConfig::new("127.0.0.1:27093", "Alice")).await?;
//! session.send_chat("hello").await?;
//! let started = session.init_game().await?;
//! # let _ = started;
//! session.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod dispatch;
mod error;
mod game;
mod session;

pub use config::{
    ClientConfig, DEFAULT_CONNECT_ATTEMPTS, DEFAULT_CONNECT_DELAY,
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_RETRIES, DEFAULT_REQUEST_TIMEOUT,
};
pub use error::ClientError;
pub use session::ClientSession;
