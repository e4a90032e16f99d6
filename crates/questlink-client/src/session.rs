//! The client session: one connection to the relay server, shared by every
//! task of the game client.
//!
//! The flow is:
//!   1. Dial the server, retrying timeouts and refusals a bounded number of
//!      times
//!   2. Spawn the reader, the only task that ever calls `recv()`
//!   3. Send `CONNEXION/NAME` and wait for `"OK"`
//!   4. Serve `request` / `notify` / `subscribe` calls from any task until
//!      shutdown or until the server goes away

use std::io::ErrorKind;
use std::sync::Arc;

use questlink_protocol::{
    Codec, Envelope, EnvelopeContent, JsonCodec, MessageType, Purpose, RouteKey,
    Uuid,
};
use questlink_transport::{Connection, TransportError, WebSocketConnection};
use tokio::sync::{Mutex, mpsc};
use tokio::task::AbortHandle;

use crate::dispatch::{DispatchTable, Dispatched};
use crate::{ClientConfig, ClientError};

/// A connected, named client session.
///
/// Cheap to clone: clones share the same connection, reader and dispatch
/// table, so any number of tasks can have requests in flight at once.
pub struct ClientSession<C: Codec = JsonCodec> {
    inner: Arc<Inner<C>>,
}

impl<C: Codec> Clone for ClientSession<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<C: Codec> {
    config: ClientConfig,
    codec: C,
    conn: Arc<WebSocketConnection>,
    table: Arc<Mutex<DispatchTable>>,
    reader: AbortHandle,
}

impl<C: Codec> Drop for Inner<C> {
    fn drop(&mut self) {
        // Last handle gone: stop the reader so it releases the connection.
        self.reader.abort();
    }
}

/// Removes a request's waiter from the dispatch table when the request
/// stops waiting, including when the caller drops or aborts it.
struct WaiterGuard {
    table: Arc<Mutex<DispatchTable>>,
    id: Uuid,
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        if let Ok(mut table) = self.table.try_lock() {
            table.cancel(self.id);
            return;
        }
        // Contended: finish the removal once the lock is free.
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let table = Arc::clone(&self.table);
        let id = self.id;
        runtime.spawn(async move {
            table.lock().await.cancel(id);
        });
    }
}

impl ClientSession<JsonCodec> {
    /// Connects with the default JSON codec.
    ///
    /// # Errors
    /// - [`ClientError::ConnectFailed`] if the server can't be reached
    /// - [`ClientError::NameTaken`] if the server rejects `config.name`
    /// - [`ClientError::Timeout`] if the server never answers the name
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        Self::connect_with_codec(config, JsonCodec).await
    }
}

impl<C: Codec + Clone> ClientSession<C> {
    /// Connects using `codec` for envelopes and their content.
    pub async fn connect_with_codec(
        config: ClientConfig,
        codec: C,
    ) -> Result<Self, ClientError> {
        let conn = Arc::new(dial(&config).await?);
        let table = Arc::new(Mutex::new(DispatchTable::new()));

        let reader = tokio::spawn(read_loop(
            Arc::clone(&conn),
            Arc::clone(&table),
            codec.clone(),
            config.name.clone(),
        ))
        .abort_handle();

        let session = Self {
            inner: Arc::new(Inner {
                config,
                codec,
                conn,
                table,
                reader,
            }),
        };

        if let Err(e) = session.negotiate_identity().await {
            session.shutdown().await;
            return Err(e);
        }

        tracing::info!(name = %session.name(), "session ready");
        Ok(session)
    }

    /// Announces our name and waits for the server's verdict.
    async fn negotiate_identity(&self) -> Result<(), ClientError> {
        let name = self.name().to_string();
        let reply = self
            .request_with(MessageType::Connexion, Purpose::Name, &name)
            .await?;

        if reply.is_ack_ok(&self.inner.codec) {
            Ok(())
        } else {
            tracing::info!(%name, "server rejected name");
            Err(ClientError::NameTaken(name))
        }
    }

    /// The name this session registered under.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// The codec used for envelopes and content.
    pub fn codec(&self) -> &C {
        &self.inner.codec
    }

    /// Returns `false` once the session has shut down or lost its
    /// connection.
    pub async fn is_connected(&self) -> bool {
        !self.inner.table.lock().await.is_closed()
    }

    /// Sends a content-less request and waits for the correlated reply.
    ///
    /// # Errors
    /// - [`ClientError::Timeout`] after the configured resends
    /// - [`ClientError::Disconnected`] if the session closes meanwhile
    pub async fn request(
        &self,
        kind: MessageType,
        purpose: Purpose,
    ) -> Result<Envelope, ClientError> {
        let envelope = Envelope::new(self.name(), kind, purpose);
        self.round_trip(envelope).await
    }

    /// Sends a request carrying `content` and waits for the correlated
    /// reply.
    pub async fn request_with<T: EnvelopeContent>(
        &self,
        kind: MessageType,
        purpose: Purpose,
        content: &T,
    ) -> Result<Envelope, ClientError> {
        let envelope = Envelope::with_content(
            self.name(),
            kind,
            purpose,
            &self.inner.codec,
            content,
        )?;
        self.round_trip(envelope).await
    }

    /// Registers a waiter, sends, and waits; resends the same envelope on
    /// timeout until the retry budget is spent.
    async fn round_trip(&self, envelope: Envelope) -> Result<Envelope, ClientError> {
        let id = envelope.id();
        let route = envelope.route();
        let bytes = self.inner.codec.encode(&envelope)?;
        let attempts = self.inner.config.request_retries + 1;
        let _guard = WaiterGuard {
            table: Arc::clone(&self.inner.table),
            id,
        };

        for attempt in 1..=attempts {
            let waiter = self
                .inner
                .table
                .lock()
                .await
                .register(id, route.clone())
                .ok_or(ClientError::Disconnected)?;

            if let Err(e) = self.inner.conn.send(&bytes).await {
                tracing::debug!(%id, %route, error = %e, "request send failed");
                return Err(ClientError::Disconnected);
            }

            let timeout = self.inner.config.request_timeout;
            match tokio::time::timeout(timeout, waiter).await {
                Ok(Ok(reply)) => return Ok(reply),
                Ok(Err(_)) => return Err(ClientError::Disconnected),
                Err(_) => {
                    // The resend registers a fresh waiter under the same id.
                    self.inner.table.lock().await.cancel(id);
                    if attempt < attempts {
                        tracing::warn!(
                            %id,
                            %route,
                            attempt,
                            "no answer, resending"
                        );
                    }
                }
            }
        }

        tracing::warn!(%id, %route, attempts, "request timed out");
        Err(ClientError::Timeout { route, attempts })
    }

    /// Sends `content` without waiting for any reply.
    pub async fn notify<T: EnvelopeContent>(
        &self,
        kind: MessageType,
        purpose: Purpose,
        content: &T,
    ) -> Result<(), ClientError> {
        let envelope = Envelope::with_content(
            self.name(),
            kind,
            purpose,
            &self.inner.codec,
            content,
        )?;
        self.send_envelope(&envelope).await
    }

    /// Sends a content-less envelope without waiting for any reply.
    pub async fn notify_empty(
        &self,
        kind: MessageType,
        purpose: Purpose,
    ) -> Result<(), ClientError> {
        let envelope = Envelope::new(self.name(), kind, purpose);
        self.send_envelope(&envelope).await
    }

    /// Answers a request received from another peer: same id, type and
    /// purpose, our name as sender.
    pub async fn reply<T: EnvelopeContent>(
        &self,
        request: &Envelope,
        content: &T,
    ) -> Result<(), ClientError> {
        let envelope =
            Envelope::reply_to(request, self.name(), &self.inner.codec, content)?;
        self.send_envelope(&envelope).await
    }

    /// Receives every envelope pushed for `(kind, purpose)` that is not a
    /// reply to one of our own requests.
    ///
    /// The subscription lasts until the receiver is dropped or the session
    /// ends (the receiver then yields `None`).
    pub async fn subscribe(
        &self,
        kind: MessageType,
        purpose: Purpose,
    ) -> Result<mpsc::UnboundedReceiver<Envelope>, ClientError> {
        self.inner
            .table
            .lock()
            .await
            .subscribe(RouteKey::new(kind, purpose))
            .ok_or(ClientError::Disconnected)
    }

    async fn send_envelope(&self, envelope: &Envelope) -> Result<(), ClientError> {
        if self.inner.table.lock().await.is_closed() {
            return Err(ClientError::Disconnected);
        }
        let bytes = self.inner.codec.encode(envelope)?;
        self.inner.conn.send(&bytes).await.map_err(|e| {
            tracing::debug!(id = %envelope.id(), error = %e, "send failed");
            ClientError::Disconnected
        })
    }

    /// Closes the connection and fails every waiting request with
    /// [`ClientError::Disconnected`]. Idempotent.
    pub async fn shutdown(&self) {
        let was_open = {
            let mut table = self.inner.table.lock().await;
            let was_open = !table.is_closed();
            table.close();
            was_open
        };

        if was_open {
            if let Err(e) = self.inner.conn.close().await {
                tracing::debug!(error = %e, "close failed");
            }
            tracing::info!(name = %self.name(), "session closed");
        }
        self.inner.reader.abort();
    }
}

/// Dials the server, retrying timeout-class failures.
async fn dial(config: &ClientConfig) -> Result<WebSocketConnection, ClientError> {
    let max_attempts = config.connect_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let outcome = tokio::time::timeout(
            config.connect_timeout,
            WebSocketConnection::connect(&config.addr),
        )
        .await;

        let reason = match outcome {
            Ok(Ok(conn)) => return Ok(conn),
            Ok(Err(e)) if !is_retryable(&e) => {
                return Err(ClientError::ConnectFailed {
                    addr: config.addr.clone(),
                    attempts: attempt,
                    reason: e.to_string(),
                });
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => "attempt timed out".to_string(),
        };

        if attempt >= max_attempts {
            return Err(ClientError::ConnectFailed {
                addr: config.addr.clone(),
                attempts: attempt,
                reason,
            });
        }

        tracing::warn!(
            addr = %config.addr,
            attempt,
            %reason,
            delay_ms = config.connect_delay.as_millis() as u64,
            "connect failed, retrying"
        );
        tokio::time::sleep(config.connect_delay).await;
    }
}

/// Timeouts, refusals and resets are worth another try; anything else
/// (bad address, not a WebSocket server) is not.
fn is_retryable(err: &TransportError) -> bool {
    matches!(
        err.io_kind(),
        ErrorKind::TimedOut
            | ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
    )
}

/// The single reader: owns `recv()` for the session's lifetime and feeds
/// the dispatch table.
async fn read_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    table: Arc<Mutex<DispatchTable>>,
    codec: C,
    name: String,
) {
    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%name, "connection closed by server");
                break;
            }
            Err(e) => {
                tracing::debug!(%name, error = %e, "recv error");
                break;
            }
        };

        let envelope: Envelope = match codec.decode(&data) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(%name, error = %e, "dropping undecodable frame");
                continue;
            }
        };

        let id = envelope.id();
        let route = envelope.route();
        let sender = envelope.sender().to_string();
        match table.lock().await.dispatch(envelope) {
            Dispatched::Reply | Dispatched::Notified(_) => {}
            Dispatched::RouteMismatch => {
                tracing::warn!(
                    %name, %id, %route, %sender,
                    "reply route does not match request, dropped"
                );
            }
            Dispatched::Unmatched => {
                tracing::warn!(
                    %name, %id, %route, %sender,
                    "no listener for envelope, dropped"
                );
            }
        }
    }

    // Push the closure to everyone still waiting.
    table.lock().await.close();
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use questlink_protocol::{ACK_OK, SERVER_SENDER};
    use questlink_transport::{Transport, WebSocketTransport};

    use super::*;

    /// Connects to a server that acknowledges the name and then never
    /// answers anything.
    async fn connect_to_silent_server() -> (ClientSession, WebSocketConnection) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap().to_string();
        let server = tokio::spawn(async move {
            let conn = transport.accept().await.unwrap();
            let data = conn.recv().await.unwrap().unwrap();
            let identity: Envelope = JsonCodec.decode(&data).unwrap();
            let ok = Envelope::reply_to(
                &identity,
                SERVER_SENDER,
                &JsonCodec,
                &ACK_OK.to_string(),
            )
            .unwrap();
            conn.send(&JsonCodec.encode(&ok).unwrap()).await.unwrap();
            conn
        });

        let config = ClientConfig::new(addr, "Alice")
            .connect_attempts(1)
            .request_timeout(Duration::from_secs(5));
        let session = ClientSession::connect(config).await.unwrap();
        (session, server.await.unwrap())
    }

    async fn pending_len(session: &ClientSession) -> usize {
        // Contended removals finish on a spawned task.
        tokio::time::sleep(Duration::from_millis(20)).await;
        session.inner.table.lock().await.pending_len()
    }

    #[tokio::test]
    async fn test_round_trip_aborted_requests_leave_no_waiter() {
        let (session, _server) = connect_to_silent_server().await;

        for _ in 0..10 {
            let caller = session.clone();
            let task = tokio::spawn(async move {
                caller.request(MessageType::Game, Purpose::GetPlayerList).await
            });
            tokio::time::sleep(Duration::from_millis(20)).await;
            task.abort();
            assert!(task.await.unwrap_err().is_cancelled());
        }

        assert_eq!(pending_len(&session).await, 0);
    }

    #[tokio::test]
    async fn test_round_trip_losing_select_leaves_no_waiter() {
        let (session, _server) = connect_to_silent_server().await;

        tokio::select! {
            _ = session.request(MessageType::Game, Purpose::InitGame) => {
                panic!("the silent server never answers");
            }
            _ = tokio::time::sleep(Duration::from_millis(50)) => {}
        }

        assert_eq!(pending_len(&session).await, 0);
        assert!(session.is_connected().await);
    }

    fn connect_error(kind: ErrorKind) -> TransportError {
        TransportError::ConnectFailed {
            addr: "127.0.0.1:1".into(),
            source: std::io::Error::from(kind),
        }
    }

    #[test]
    fn test_is_retryable_timeout_class_errors() {
        assert!(is_retryable(&connect_error(ErrorKind::TimedOut)));
        assert!(is_retryable(&connect_error(ErrorKind::ConnectionRefused)));
        assert!(is_retryable(&connect_error(ErrorKind::ConnectionReset)));
    }

    #[test]
    fn test_is_retryable_rejects_other_errors() {
        assert!(!is_retryable(&connect_error(ErrorKind::InvalidData)));
        assert!(!is_retryable(&connect_error(ErrorKind::InvalidInput)));
        assert!(!is_retryable(&TransportError::SendFailed(
            std::io::Error::from(ErrorKind::BrokenPipe),
        )));
    }
}
