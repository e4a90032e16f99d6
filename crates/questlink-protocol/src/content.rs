//! Content kinds: the tag that tells a receiver what shape an envelope's
//! payload has.
//!
//! The payload itself travels as opaque bytes (encoded by the [`Codec`]).
//! Without a tag, the receiver would have to guess the payload's type.
//! With one, decoding is a two-step check: does the tag match what I
//! asked for, and do the bytes decode as that type?
//!
//! [`Codec`]: crate::Codec

use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// The runtime shape of an envelope's content.
///
/// This is a closed set. An envelope carrying a tag not listed here fails
/// to decode as a whole, which the receiving side treats as a malformed
/// envelope.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentKind {
    /// No content. Pure acknowledgements and bare requests.
    #[default]
    Empty,
    /// A UTF-8 string.
    Text,
    /// A boolean.
    Flag,
    /// One card.
    Card,
    /// An ordered list of cards (a discard pile, a hand).
    CardList,
    /// One player.
    Player,
    /// An ordered list of players.
    PlayerList,
}

/// A Rust type that can travel as envelope content.
///
/// Each implementor declares which [`ContentKind`] tag it is sent under.
/// The game crate implements this for its own card and player types:
///
/// ```rust
/// use questlink_protocol::{ContentKind, EnvelopeContent};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Card {
///     name: String,
/// }
///
/// impl EnvelopeContent for Card {
///     const KIND: ContentKind = ContentKind::Card;
/// }
/// ```
pub trait EnvelopeContent: Serialize + DeserializeOwned {
    /// The tag written next to this type's bytes.
    const KIND: ContentKind;
}

impl EnvelopeContent for String {
    const KIND: ContentKind = ContentKind::Text;
}

impl EnvelopeContent for bool {
    const KIND: ContentKind = ContentKind::Flag;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&ContentKind::CardList).unwrap();
        assert_eq!(json, "\"CARD_LIST\"");
    }

    #[test]
    fn test_content_kind_default_is_empty() {
        assert_eq!(ContentKind::default(), ContentKind::Empty);
    }

    #[test]
    fn test_content_kind_rejects_unknown_tag() {
        let result: Result<ContentKind, _> = serde_json::from_str("\"DECK\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_builtin_content_kinds() {
        assert_eq!(<String as EnvelopeContent>::KIND, ContentKind::Text);
        assert_eq!(<bool as EnvelopeContent>::KIND, ContentKind::Flag);
    }
}
