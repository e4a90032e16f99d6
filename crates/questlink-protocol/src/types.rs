//! The envelope: the one structure that travels on the wire.
//!
//! Every message between a game client and the relay server, in either
//! direction, is an [`Envelope`]. Think of it like a postal envelope:
//! identity and routing on the outside, an opaque payload inside.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ id: 5b0e…            ← correlation only   │
//! │ sender: "Alice"      ← unique peer name   │
//! │ type: GAME           ← first dispatch key │
//! │ purpose: GET_PLAYER_LIST  ← second key    │
//! │ contentKind: PLAYER_LIST  ← payload shape │
//! │ ┌──────────────────────────────────────┐ │
//! │ │ content: [..bytes..] | null          │ │
//! │ └──────────────────────────────────────┘ │
//! └──────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Codec, ContentKind, EnvelopeContent, MessageType, ProtocolError, Purpose,
    RouteKey,
};

// ---------------------------------------------------------------------------
// Protocol constants
// ---------------------------------------------------------------------------

/// Port the relay server listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 27093;

/// Reply content accepting a proposed name in `CONNEXION/NAME`.
pub const ACK_OK: &str = "OK";

/// Reply content rejecting a proposed name in `CONNEXION/NAME`.
pub const ACK_NAME_TAKEN: &str = "NAME_TAKEN";

/// Sender name the server uses on envelopes it originates.
pub const SERVER_SENDER: &str = "SERVER";

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The top-level message wrapper. Every frame on the wire is one Envelope.
///
/// Fields are private: an envelope is immutable once built. Use the
/// constructors ([`new`](Self::new), [`with_content`](Self::with_content),
/// [`reply_to`](Self::reply_to)) and the accessors.
///
/// Serde writes fields in declaration order, which is the wire order:
/// `id, sender, type, purpose, contentKind, content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Fresh per envelope; links a reply to its request and nothing else.
    id: Uuid,

    /// Display name of the originating peer.
    sender: String,

    /// `type` is a Rust keyword, hence the rename.
    #[serde(rename = "type")]
    kind: MessageType,

    purpose: Purpose,

    content_kind: ContentKind,

    /// Content encoded by the sender's codec. `None` → JSON `null`.
    content: Option<Vec<u8>>,
}

impl Envelope {
    /// Builds an envelope with no content and a fresh id.
    pub fn new(
        sender: impl Into<String>,
        kind: MessageType,
        purpose: Purpose,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: sender.into(),
            kind,
            purpose,
            content_kind: ContentKind::Empty,
            content: None,
        }
    }

    /// Builds an envelope carrying `value`, tagged with `T::KIND`.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the codec cannot encode `value`.
    pub fn with_content<T: EnvelopeContent>(
        sender: impl Into<String>,
        kind: MessageType,
        purpose: Purpose,
        codec: &impl Codec,
        value: &T,
    ) -> Result<Self, ProtocolError> {
        let bytes = codec.encode(value)?;
        Ok(Self {
            content_kind: T::KIND,
            content: Some(bytes),
            ..Self::new(sender, kind, purpose)
        })
    }

    /// Builds the reply to `request`: same id, type and purpose, new sender
    /// and content.
    pub fn reply_to<T: EnvelopeContent>(
        request: &Envelope,
        sender: impl Into<String>,
        codec: &impl Codec,
        value: &T,
    ) -> Result<Self, ProtocolError> {
        let bytes = codec.encode(value)?;
        Ok(Self {
            id: request.id,
            sender: sender.into(),
            kind: request.kind.clone(),
            purpose: request.purpose.clone(),
            content_kind: T::KIND,
            content: Some(bytes),
        })
    }

    /// Builds a content-less reply to `request`.
    pub fn empty_reply_to(request: &Envelope, sender: impl Into<String>) -> Self {
        Self {
            id: request.id,
            sender: sender.into(),
            kind: request.kind.clone(),
            purpose: request.purpose.clone(),
            content_kind: ContentKind::Empty,
            content: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn kind(&self) -> &MessageType {
        &self.kind
    }

    pub fn purpose(&self) -> &Purpose {
        &self.purpose
    }

    pub fn content_kind(&self) -> ContentKind {
        self.content_kind
    }

    /// The raw content bytes, if any.
    pub fn raw_content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }

    /// The `(type, purpose)` dispatch key.
    pub fn route(&self) -> RouteKey {
        RouteKey::new(self.kind.clone(), self.purpose.clone())
    }

    /// Returns `true` if this envelope has the given `(type, purpose)`.
    pub fn is_route(&self, kind: &MessageType, purpose: &Purpose) -> bool {
        &self.kind == kind && &self.purpose == purpose
    }

    /// Decodes the content as `T`.
    ///
    /// Returns `Ok(None)` when the envelope carries no content.
    ///
    /// # Errors
    /// - [`ProtocolError::ContentKindMismatch`] if the tag is not `T::KIND`
    /// - [`ProtocolError::Decode`] if the bytes don't decode as `T`
    pub fn content<T: EnvelopeContent>(
        &self,
        codec: &impl Codec,
    ) -> Result<Option<T>, ProtocolError> {
        let Some(bytes) = &self.content else {
            return Ok(None);
        };
        if self.content_kind != T::KIND {
            return Err(ProtocolError::ContentKindMismatch {
                expected: T::KIND,
                found: self.content_kind,
            });
        }
        codec.decode(bytes).map(Some)
    }

    /// Returns `true` if the content is the text [`ACK_OK`].
    pub fn is_ack_ok(&self, codec: &impl Codec) -> bool {
        matches!(self.content::<String>(codec), Ok(Some(text)) if text == ACK_OK)
    }
}

// =========================================================================
// Tests
// =========================================================================
