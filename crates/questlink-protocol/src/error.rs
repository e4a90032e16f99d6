//! Error types for the protocol layer.
//!
//! Each crate in Questlink defines its own error enum. When you see a
//! `ProtocolError`, the problem is in encoding or decoding an envelope,
//! not in the network or the peer registry.

use crate::ContentKind;

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust value).
    ///
    /// Common causes: malformed JSON, missing fields, an unknown
    /// `contentKind` tag, or a truncated frame.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The envelope's content tag does not match the type the caller
    /// asked to decode it as.
    #[error("content kind mismatch: expected {expected:?}, found {found:?}")]
    ContentKindMismatch {
        expected: ContentKind,
        found: ContentKind,
    },

    /// The message decoded but breaks a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
