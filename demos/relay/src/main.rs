use questlink::prelude::*;
use questlink::protocol::ProtocolError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Game types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub name: String,
    pub level: u8,
}

impl EnvelopeContent for Card {
    const KIND: ContentKind = ContentKind::Card;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pile(pub Vec<Card>);

impl EnvelopeContent for Pile {
    const KIND: ContentKind = ContentKind::CardList;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
}

impl EnvelopeContent for Player {
    const KIND: ContentKind = ContentKind::Player;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster(pub Vec<Player>);

impl EnvelopeContent for Roster {
    const KIND: ContentKind = ContentKind::PlayerList;
}

// ---------------------------------------------------------------------------
// Game host
// ---------------------------------------------------------------------------

/// The shared table, answered on behalf of every player.
///
/// A drawn card is resolved at once and lands on its discard pile. An
/// empty deck is rebuilt from its discard pile, bottom card first.
struct Table {
    donjon: Vec<Card>,
    treasure: Vec<Card>,
    donjon_discard: Vec<Card>,
    treasure_discard: Vec<Card>,
    turn: usize,
    started: bool,
}

fn deck(names: &[(&str, u8)]) -> Vec<Card> {
    names
        .iter()
        .rev()
        .map(|(name, level)| Card { name: name.to_string(), level: *level })
        .collect()
}

impl Table {
    fn new() -> Self {
        Self {
            donjon: deck(&[("Goblin", 1), ("Skeleton", 2), ("Troll", 5), ("Dragon", 9)]),
            treasure: deck(&[("Dagger", 1), ("Shield", 2), ("Potion", 1), ("Crown", 4)]),
            donjon_discard: Vec::new(),
            treasure_discard: Vec::new(),
            turn: 0,
            started: false,
        }
    }

    /// Builds the answer to `request`, or `None` if it isn't one the table
    /// answers. `players` is the sorted list of connected names.
    fn answer(
        &mut self,
        request: &Envelope,
        players: &[String],
    ) -> Result<Option<Envelope>, ProtocolError> {
        // Replies between peers are relayed too; only bare requests count.
        if request.content_kind() != ContentKind::Empty {
            return Ok(None);
        }

        let reply = |content: &dyn ReplyContent| content.reply(request).map(Some);

        match (request.kind(), request.purpose()) {
            (MessageType::Ping, _) => Ok(Some(Envelope::empty_reply_to(request, SERVER_SENDER))),
            (MessageType::Game, Purpose::DrawDonjonCard) => {
                let Some(card) = draw(&mut self.donjon, &mut self.donjon_discard) else {
                    return Ok(None);
                };
                if !players.is_empty() {
                    self.turn = (self.turn + 1) % players.len();
                }
                reply(&card)
            }
            (MessageType::Game, Purpose::DrawTreasureCard) => {
                match draw(&mut self.treasure, &mut self.treasure_discard) {
                    Some(card) => reply(&card),
                    None => Ok(None),
                }
            }
            (MessageType::Game, Purpose::GetDonjonDiscard) => {
                reply(&Pile(self.donjon_discard.clone()))
            }
            (MessageType::Game, Purpose::GetTreasureDiscard) => {
                reply(&Pile(self.treasure_discard.clone()))
            }
            (MessageType::Game, Purpose::GetCurrentPlayer) => {
                match players.get(self.turn % players.len().max(1)) {
                    Some(name) => reply(&Player { name: name.clone() }),
                    None => Ok(None),
                }
            }
            (MessageType::Game, Purpose::GetPlayerList) => {
                let roster = players.iter().map(|name| Player { name: name.clone() });
                reply(&Roster(roster.collect()))
            }
            (MessageType::Game, Purpose::InitGame) => {
                let started = !self.started && players.len() >= 2;
                if started {
                    self.started = true;
                    self.turn = 0;
                }
                reply(&started)
            }
            _ => Ok(None),
        }
    }
}

/// Object-safe wrapper over `Envelope::reply_to`.
trait ReplyContent {
    fn reply(&self, request: &Envelope) -> Result<Envelope, ProtocolError>;
}

impl<T: EnvelopeContent> ReplyContent for T {
    fn reply(&self, request: &Envelope) -> Result<Envelope, ProtocolError> {
        Envelope::reply_to(request, SERVER_SENDER, &JsonCodec, self)
    }
}

fn draw(deck: &mut Vec<Card>, discard: &mut Vec<Card>) -> Option<Card> {
    if deck.is_empty() {
        deck.extend(discard.drain(..).rev());
    }
    let card = deck.pop()?;
    discard.push(card.clone());
    Some(card)
}

/// Answers game requests relayed through the hub until the server stops.
async fn host(hub: HubHandle) {
    let mut relayed = hub.subscribe().await;
    let mut table = Table::new();

    while let Some(Relayed { origin, envelope }) = relayed.recv().await {
        let players = hub.peer_names().await;
        let reply = match table.answer(&envelope, &players) {
            Ok(Some(reply)) => reply,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(%origin, id = %envelope.id(), error = %e, "cannot answer");
                continue;
            }
        };
        if let Err(e) = hub.send_to(&origin, reply).await {
            tracing::debug!(%origin, error = %e, "requester left before the answer");
        }
    }
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("QUESTLINK_ADDR")
        .unwrap_or_else(|_| format!("0.0.0.0:{DEFAULT_PORT}"));

    let server = QuestlinkServer::builder().bind(&addr).build().await?;
    tokio::spawn(host(server.hub()));

    server.run().await?;
    Ok(())
}
