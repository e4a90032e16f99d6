//! Unified error type for Questlink.

use questlink_client::ClientError;
use questlink_hub::HubError;
use questlink_protocol::ProtocolError;
use questlink_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `questlink` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum QuestlinkError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, content mismatch).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A registry error (name taken, unknown peer).
    #[error(transparent)]
    Hub(#[from] HubError),

    /// A client session error (connect, timeout, disconnected).
    #[error(transparent)]
    Client(#[from] ClientError),
}
