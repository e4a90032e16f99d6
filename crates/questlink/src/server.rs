//! `QuestlinkServer` builder and server loop.
//!
//! This is the entry point for running a Questlink relay. It ties together
//! all the layers: transport → protocol → hub.

use std::sync::Arc;
use std::time::Duration;

use questlink_hub::{Hub, HubError, Relayed};
use questlink_protocol::{Codec, DEFAULT_PORT, Envelope, JsonCodec};
use questlink_transport::{Transport, WebSocketTransport};
use tokio::sync::{Mutex, mpsc};

use crate::QuestlinkError;
use crate::handler::handle_connection;

/// How long a new connection may take to announce its name.
pub const DEFAULT_IDENTITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) hub: Arc<Mutex<Hub>>,
    pub(crate) codec: C,
    pub(crate) identity_timeout: Duration,
}

/// Builder for configuring and starting a Questlink server.
///
/// # Example
///
/// ```rust,no_run
/// use questlink::prelude::*;
///
/// # async fn run() -> Result<(), QuestlinkError> {
/// let server = QuestlinkServer::builder()
///     .bind("0.0.0.0:27093")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct QuestlinkServerBuilder {
    bind_addr: String,
    identity_timeout: Duration,
}

impl QuestlinkServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{DEFAULT_PORT}"),
            identity_timeout: DEFAULT_IDENTITY_TIMEOUT,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets how long a fresh connection may stay silent before it is
    /// dropped.
    pub fn identity_timeout(mut self, timeout: Duration) -> Self {
        self.identity_timeout = timeout;
        self
    }

    /// Binds the listener using `JsonCodec`.
    pub async fn build(self) -> Result<QuestlinkServer<JsonCodec>, QuestlinkError> {
        self.build_with_codec(JsonCodec).await
    }

    /// Binds the listener using `codec` for every envelope.
    pub async fn build_with_codec<C: Codec + Clone>(
        self,
        codec: C,
    ) -> Result<QuestlinkServer<C>, QuestlinkError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            hub: Arc::new(Mutex::new(Hub::new())),
            codec,
            identity_timeout: self.identity_timeout,
        });

        Ok(QuestlinkServer { transport, state })
    }
}

impl Default for QuestlinkServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Questlink relay.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct QuestlinkServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl QuestlinkServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> QuestlinkServerBuilder {
        QuestlinkServerBuilder::new()
    }
}

impl<C: Codec + Clone> QuestlinkServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns a handle to the peer registry for in-process game logic.
    pub fn hub(&self) -> HubHandle {
        HubHandle {
            hub: Arc::clone(&self.state.hub),
        }
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a handler task for each accepted connection. A failed accept
    /// or a failed peer never stops the loop; it runs until the process is
    /// terminated.
    pub async fn run(mut self) -> Result<(), QuestlinkError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "Questlink server listening");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Cloneable access to the server's peer registry.
///
/// Game logic hosted inside the server process uses this to watch relayed
/// requests and answer the peer that sent them.
#[derive(Clone)]
pub struct HubHandle {
    hub: Arc<Mutex<Hub>>,
}

impl HubHandle {
    /// Receives every envelope relayed by a registered peer.
    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<Relayed> {
        self.hub.lock().await.subscribe()
    }

    /// Delivers `envelope` to the peer named `name` only.
    pub async fn send_to(&self, name: &str, envelope: Envelope) -> Result<(), HubError> {
        self.hub.lock().await.send_to(name, envelope)
    }

    /// Names of the connected peers, sorted.
    pub async fn peer_names(&self) -> Vec<String> {
        self.hub.lock().await.peer_names()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.hub.lock().await.contains(name)
    }
}
