//! Codec trait and implementations for turning envelopes into frames.
//!
//! A codec converts between Rust values and raw bytes. The same codec is
//! used twice per message: once for the envelope's content (which the
//! envelope then carries as opaque bytes) and once for the envelope itself.
//! The transport only ever sees the outer bytes.
//!
//! [`JsonCodec`] is the only implementation today. The envelope's own
//! fields read as plain JSON in a packet capture; its content does not, since
//! it is written as an array of byte values.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust values to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by the
/// client's reader task, every caller task, and every server handler.
///
/// The methods are generic over the value type: `encode` accepts anything
/// `Serialize`, `decode` produces anything `DeserializeOwned` (owned, so the
/// input frame can be dropped right after decoding).
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// truncated, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use questlink_protocol::{Codec, Envelope, JsonCodec, MessageType, Purpose};
///
/// let codec = JsonCodec;
/// let envelope = Envelope::new("Alice", MessageType::Ping, Purpose::Empty);
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;

    #[test]
    fn test_json_codec_string_is_quoted_json() {
        let bytes = JsonCodec.encode(&"OK".to_string()).unwrap();
        assert_eq!(bytes, b"\"OK\"");
    }

    #[test]
    fn test_json_codec_decode_garbage_returns_decode_error() {
        let result: Result<String, _> = JsonCodec.decode(b"{not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_decode_wrong_type_returns_decode_error() {
        let result: Result<bool, _> = JsonCodec.decode(b"\"OK\"");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
