/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Dialing the remote peer failed.
    ///
    /// The inner `io::Error` keeps its [`ErrorKind`](std::io::ErrorKind)
    /// so callers can tell a refused or timed-out dial from a bad address.
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),
}

impl TransportError {
    /// Returns the kind of the underlying I/O error.
    pub fn io_kind(&self) -> std::io::ErrorKind {
        match self {
            Self::ConnectFailed { source, .. }
            | Self::SendFailed(source)
            | Self::ReceiveFailed(source)
            | Self::AcceptFailed(source) => source.kind(),
        }
    }
}
