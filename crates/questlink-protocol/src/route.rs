//! Routing keys: the `(type, purpose)` pair every envelope is dispatched on.
//!
//! On the wire both keys are bare strings (`"GAME"`, `"DRAW_DONJON_CARD"`)
//! so older peers keep working. In Rust they are closed enums with an
//! explicit `Unknown` variant: a `match` over them is exhaustive, and a
//! string nobody has modelled yet survives a decode/encode cycle untouched
//! instead of being silently rewritten.
//!
//! Equality and hashing go through the wire string, so a hand-built
//! `Unknown("NAME")` is the same key as `Name`.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// MessageType: first dispatch key
// ---------------------------------------------------------------------------

/// Coarse category of an envelope.
///
/// `#[serde(from = "String", into = "String")]` makes serde go through the
/// `From` conversions below, so `MessageType::Game` is written as the plain
/// JSON string `"GAME"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
    /// Identity negotiation and join notifications.
    Connexion,
    /// Game actions and queries answered by the game host.
    Game,
    /// Free-form chat between players.
    Chat,
    /// Liveness probe.
    Ping,
    /// A type string this build does not model.
    Unknown(String),
}

impl MessageType {
    /// Returns the wire string for this type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connexion => "CONNEXION",
            Self::Game => "GAME",
            Self::Chat => "CHAT",
            Self::Ping => "PING",
            Self::Unknown(s) => s,
        }
    }
}

impl PartialEq for MessageType {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for MessageType {}

impl Hash for MessageType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl From<&str> for MessageType {
    fn from(s: &str) -> Self {
        match s {
            "CONNEXION" => Self::Connexion,
            "GAME" => Self::Game,
            "CHAT" => Self::Chat,
            "PING" => Self::Ping,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for MessageType {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<MessageType> for String {
    fn from(kind: MessageType) -> Self {
        match kind {
            MessageType::Unknown(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Purpose: second dispatch key
// ---------------------------------------------------------------------------

/// Fine-grained operation within a [`MessageType`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Purpose {
    /// `CONNEXION/NAME`: identity announcement and its acknowledgement.
    Name,
    DrawDonjonCard,
    DrawTreasureCard,
    GetDonjonDiscard,
    GetTreasureDiscard,
    GetCurrentPlayer,
    GetPlayerList,
    InitGame,
    /// `CHAT/MESSAGE`: a line of chat.
    Message,
    /// The empty purpose, used by `PING`.
    Empty,
    /// A purpose string this build does not model.
    Unknown(String),
}

impl Purpose {
    /// Returns the wire string for this purpose.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Name => "NAME",
            Self::DrawDonjonCard => "DRAW_DONJON_CARD",
            Self::DrawTreasureCard => "DRAW_TREASURE_CARD",
            Self::GetDonjonDiscard => "GET_DONJON_DISCARD",
            Self::GetTreasureDiscard => "GET_TREASURE_DISCARD",
            Self::GetCurrentPlayer => "GET_CURRENT_PLAYER",
            Self::GetPlayerList => "GET_PLAYER_LIST",
            Self::InitGame => "INIT_GAME",
            Self::Message => "MESSAGE",
            Self::Empty => "",
            Self::Unknown(s) => s,
        }
    }
}

impl PartialEq for Purpose {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Purpose {}

impl Hash for Purpose {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl From<&str> for Purpose {
    fn from(s: &str) -> Self {
        match s {
            "NAME" => Self::Name,
            "DRAW_DONJON_CARD" => Self::DrawDonjonCard,
            "DRAW_TREASURE_CARD" => Self::DrawTreasureCard,
            "GET_DONJON_DISCARD" => Self::GetDonjonDiscard,
            "GET_TREASURE_DISCARD" => Self::GetTreasureDiscard,
            "GET_CURRENT_PLAYER" => Self::GetCurrentPlayer,
            "GET_PLAYER_LIST" => Self::GetPlayerList,
            "INIT_GAME" => Self::InitGame,
            "MESSAGE" => Self::Message,
            "" => Self::Empty,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for Purpose {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Purpose> for String {
    fn from(purpose: Purpose) -> Self {
        match purpose {
            Purpose::Unknown(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RouteKey
// ---------------------------------------------------------------------------

/// The `(type, purpose)` pair used as a dispatch key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub kind: MessageType,
    pub purpose: Purpose,
}

impl RouteKey {
    pub fn new(kind: MessageType, purpose: Purpose) -> Self {
        Self { kind, purpose }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.purpose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_serializes_as_wire_string() {
        let json = serde_json::to_string(&MessageType::Connexion).unwrap();
        assert_eq!(json, "\"CONNEXION\"");
    }

    #[test]
    fn test_message_type_unknown_survives_round_trip() {
        let kind: MessageType = serde_json::from_str("\"TRADE\"").unwrap();
        assert_eq!(kind, MessageType::Unknown("TRADE".into()));
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"TRADE\"");
    }

    #[test]
    fn test_message_type_known_strings_map_to_variants() {
        for kind in [
            MessageType::Connexion,
            MessageType::Game,
            MessageType::Chat,
            MessageType::Ping,
        ] {
            assert_eq!(MessageType::from(kind.as_str()), kind);
        }
    }

    #[test]
    fn test_purpose_known_strings_map_to_variants() {
        for purpose in [
            Purpose::Name,
            Purpose::DrawDonjonCard,
            Purpose::DrawTreasureCard,
            Purpose::GetDonjonDiscard,
            Purpose::GetTreasureDiscard,
            Purpose::GetCurrentPlayer,
            Purpose::GetPlayerList,
            Purpose::InitGame,
            Purpose::Message,
            Purpose::Empty,
        ] {
            assert_eq!(Purpose::from(purpose.as_str()), purpose);
        }
    }

    #[test]
    fn test_purpose_empty_is_empty_string() {
        assert_eq!(serde_json::to_string(&Purpose::Empty).unwrap(), "\"\"");
        let p: Purpose = serde_json::from_str("\"\"").unwrap();
        assert_eq!(p, Purpose::Empty);
    }

    #[test]
    fn test_route_key_display() {
        let key = RouteKey::new(MessageType::Game, Purpose::GetPlayerList);
        assert_eq!(key.to_string(), "GAME/GET_PLAYER_LIST");
    }

    #[test]
    fn test_unknown_spelling_of_known_string_is_same_key() {
        assert_eq!(Purpose::Unknown("NAME".into()), Purpose::Name);
        assert_eq!(MessageType::Unknown("GAME".into()), MessageType::Game);
        assert_ne!(Purpose::Unknown("NAMES".into()), Purpose::Name);

        let mut routes = std::collections::HashSet::new();
        routes.insert(RouteKey::new(MessageType::Connexion, Purpose::Name));
        assert!(routes.contains(&RouteKey::new(
            MessageType::Unknown("CONNEXION".into()),
            Purpose::Unknown("NAME".into()),
        )));
    }

    #[test]
    fn test_hand_built_unknown_survives_wire_cycle() {
        let purpose = Purpose::Unknown("NAME".into());
        let json = serde_json::to_string(&purpose).unwrap();
        assert_eq!(json, "\"NAME\"");
        let back: Purpose = serde_json::from_str(&json).unwrap();
        assert_eq!(back, purpose);
        assert!(matches!(back, Purpose::Name));
    }
}
