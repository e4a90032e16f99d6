//! Per-connection handler: identity negotiation and relaying.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive the first decodable envelope → its sender is the name
//!   2. Register the name → reply "OK", or "NAME_TAKEN" and close
//!   3. Broadcast the identity envelope to the other peers
//!   4. Loop: receive envelopes → broadcast to everyone else
//!
//! A writer task drains the peer's outbound queue to the socket in
//! parallel with step 4.

use std::sync::Arc;

use questlink_hub::HubError;
use questlink_protocol::{
    ACK_NAME_TAKEN, ACK_OK, Codec, Envelope, SERVER_SENDER,
};
use questlink_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::QuestlinkError;
use crate::server::ServerState;

/// Drop guard that unregisters a peer when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async lock.
struct PeerGuard<C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for PeerGuard<C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let hub = Arc::clone(&self.state.hub);
        tokio::spawn(async move {
            hub.lock().await.unregister(conn_id);
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), QuestlinkError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    // --- Step 1: Identity ---
    let Some(identity) = await_identity(&conn, &state).await? else {
        return Ok(());
    };
    let name = identity.sender().to_string();

    // --- Step 2: Registration ---
    let (tx, rx) = mpsc::unbounded_channel();
    let registered = state.hub.lock().await.register(&name, conn_id, tx);

    match registered {
        Ok(()) => {}
        Err(HubError::NameTaken(_)) => {
            tracing::info!(%conn_id, %name, "name taken, rejecting");
            let reply = Envelope::reply_to(
                &identity,
                SERVER_SENDER,
                &state.codec,
                &ACK_NAME_TAKEN.to_string(),
            )?;
            conn.send(&state.codec.encode(&reply)?).await?;
            conn.close().await?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }
    let _guard = PeerGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    // The OK goes straight to the socket, ahead of anything already queued
    // for this peer by other handlers.
    let ok = Envelope::reply_to(
        &identity,
        SERVER_SENDER,
        &state.codec,
        &ACK_OK.to_string(),
    )?;
    conn.send(&state.codec.encode(&ok)?).await?;

    // --- Step 3: Announce ---
    relay(&state, &identity, conn_id).await;

    let mut writer = tokio::spawn(write_loop(
        Arc::clone(&conn),
        rx,
        Arc::clone(&state),
        name.clone(),
    ));

    // --- Step 4: Relay loop ---
    while let Some(data) = next_frame(&conn, &mut writer, &name).await {
        match state.codec.decode::<Envelope>(&data) {
            Ok(envelope) => relay(&state, &envelope, conn_id).await,
            Err(e) => {
                tracing::warn!(
                    %conn_id,
                    %name,
                    error = %e,
                    "dropping malformed envelope"
                );
            }
        }
    }

    writer.abort();
    // _guard drops here → unregister fires.
    Ok(())
}

/// Waits for the peer's next frame.
///
/// Returns `None` once the peer closes, the read fails, or the writer
/// task has stopped.
async fn next_frame(
    conn: &WebSocketConnection,
    writer: &mut JoinHandle<()>,
    name: &str,
) -> Option<Vec<u8>> {
    let conn_id = conn.id();
    let received = tokio::select! {
        received = conn.recv() => received,
        _ = writer => {
            tracing::debug!(%conn_id, %name, "writer stopped, leaving");
            return None;
        }
    };
    match received {
        Ok(Some(data)) => Some(data),
        Ok(None) => {
            tracing::info!(%conn_id, %name, "connection closed cleanly");
            None
        }
        Err(e) => {
            tracing::debug!(%conn_id, %name, error = %e, "recv error");
            None
        }
    }
}

/// Reads until one envelope decodes, within the identity timeout.
///
/// Returns `None` if the peer leaves or stays silent first.
async fn await_identity<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
) -> Result<Option<Envelope>, QuestlinkError> {
    let conn_id = conn.id();
    let first = tokio::time::timeout(state.identity_timeout, async {
        loop {
            let Some(data) = conn.recv().await? else {
                return Ok::<_, QuestlinkError>(None);
            };
            match state.codec.decode::<Envelope>(&data) {
                Ok(envelope) => return Ok(Some(envelope)),
                Err(e) => {
                    tracing::warn!(
                        %conn_id,
                        error = %e,
                        "dropping malformed envelope before identity"
                    );
                }
            }
        }
    })
    .await;

    match first {
        Ok(Ok(Some(envelope))) => Ok(Some(envelope)),
        Ok(Ok(None)) => {
            tracing::debug!(%conn_id, "closed before identifying");
            Ok(None)
        }
        Ok(Err(e)) => Err(e),
        Err(_) => {
            tracing::info!(%conn_id, "identity timed out");
            // Best effort; the peer is being dropped anyway.
            let _ = conn.close().await;
            Ok(None)
        }
    }
}

/// Broadcasts `envelope` to everyone but `origin`.
async fn relay<C: Codec>(state: &ServerState<C>, envelope: &Envelope, origin: ConnectionId) {
    let removed = state.hub.lock().await.broadcast(envelope, origin);
    tracing::debug!(
        %origin,
        id = %envelope.id(),
        route = %envelope.route(),
        dropped = removed.len(),
        "relayed"
    );
}

/// Drains the peer's outbound queue to the socket.
///
/// Returns on the first write failure, which ends the handler's read loop
/// and with it the registration.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut rx: mpsc::UnboundedReceiver<Envelope>,
    state: Arc<ServerState<C>>,
    name: String,
) {
    while let Some(envelope) = rx.recv().await {
        let bytes = match state.codec.encode(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(
                    %name,
                    id = %envelope.id(),
                    error = %e,
                    "cannot encode envelope"
                );
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%name, error = %e, "write failed, closing");
            let _ = conn.close().await;
            return;
        }
    }
}
