//! Typed helpers for the requests the game and GUI layers make.
//!
//! The card and player types belong to the game crate, so each helper is
//! generic over the content type the caller expects back.

use std::time::{Duration, Instant};

use questlink_protocol::{
    Codec, EnvelopeContent, MessageType, ProtocolError, Purpose,
};

use crate::{ClientError, ClientSession};

impl<C: Codec + Clone> ClientSession<C> {
    /// Sends `PING` and returns the round-trip time to the first peer that
    /// answers it.
    pub async fn ping(&self) -> Result<Duration, ClientError> {
        let started = Instant::now();
        self.request(MessageType::Ping, Purpose::Empty).await?;
        Ok(started.elapsed())
    }

    /// Sends one line of chat to every other player.
    pub async fn send_chat(&self, text: impl Into<String>) -> Result<(), ClientError> {
        self.notify(MessageType::Chat, Purpose::Message, &text.into())
            .await
    }

    pub async fn draw_donjon_card<T: EnvelopeContent>(&self) -> Result<T, ClientError> {
        self.fetch(Purpose::DrawDonjonCard).await
    }

    pub async fn draw_treasure_card<T: EnvelopeContent>(&self) -> Result<T, ClientError> {
        self.fetch(Purpose::DrawTreasureCard).await
    }

    /// The donjon discard pile, as whatever list type the game uses.
    pub async fn donjon_discard<T: EnvelopeContent>(&self) -> Result<T, ClientError> {
        self.fetch(Purpose::GetDonjonDiscard).await
    }

    pub async fn treasure_discard<T: EnvelopeContent>(&self) -> Result<T, ClientError> {
        self.fetch(Purpose::GetTreasureDiscard).await
    }

    pub async fn current_player<T: EnvelopeContent>(&self) -> Result<T, ClientError> {
        self.fetch(Purpose::GetCurrentPlayer).await
    }

    pub async fn player_list<T: EnvelopeContent>(&self) -> Result<T, ClientError> {
        self.fetch(Purpose::GetPlayerList).await
    }

    /// Asks the game host to start the game; `true` if it did.
    pub async fn init_game(&self) -> Result<bool, ClientError> {
        self.fetch(Purpose::InitGame).await
    }

    /// Sends `GAME/<purpose>` and decodes the reply's content as `T`.
    async fn fetch<T: EnvelopeContent>(&self, purpose: Purpose) -> Result<T, ClientError> {
        let reply = self.request(MessageType::Game, purpose).await?;
        reply.content(self.codec())?.ok_or_else(|| {
            ProtocolError::InvalidMessage(format!(
                "{} reply from {} has no content",
                reply.route(),
                reply.sender()
            ))
            .into()
        })
    }
}
