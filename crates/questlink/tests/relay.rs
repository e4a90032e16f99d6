//! Integration tests for the relay server with real client sessions.

use std::time::Duration;

use questlink::prelude::*;
use questlink::transport::{Connection, WebSocketConnection};
use serde::{Deserialize, Serialize};

// =========================================================================
// Helpers
// =========================================================================

/// Starts a server on an OS-assigned port.
async fn start_server() -> (HubHandle, String) {
    let server = QuestlinkServer::builder()
        .bind("127.0.0.1:0")
        .identity_timeout(Duration::from_secs(2))
        .build()
        .await
        .expect("server should bind");
    let addr = server.local_addr().expect("local addr").to_string();
    let hub = server.hub();
    tokio::spawn(server.run());
    (hub, addr)
}

fn config(addr: &str, name: &str) -> ClientConfig {
    ClientConfig::new(addr, name)
        .connect_attempts(1)
        .request_timeout(Duration::from_secs(2))
        .request_retries(0)
}

async fn join(addr: &str, name: &str) -> ClientSession {
    ClientSession::connect(config(addr, name))
        .await
        .unwrap_or_else(|e| panic!("{name} should connect: {e}"))
}

async fn next(rx: &mut tokio::sync::mpsc::UnboundedReceiver<Envelope>) -> Envelope {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("envelope should arrive")
        .expect("subscription open")
}

/// Waits until the hub no longer lists `name`.
async fn wait_gone(hub: &HubHandle, name: &str) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while hub.contains(name).await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("peer should be unregistered");
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Card {
    name: String,
    level: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
struct DiscardPile(Vec<Card>);

impl EnvelopeContent for DiscardPile {
    const KIND: ContentKind = ContentKind::CardList;
}

// =========================================================================
// Identity
// =========================================================================

#[tokio::test]
async fn test_duplicate_name_rejected_others_accepted() {
    let (hub, addr) = start_server().await;

    let alice = join(&addr, "Alice").await;
    let mut joins = alice
        .subscribe(MessageType::Connexion, Purpose::Name)
        .await
        .unwrap();

    let second = ClientSession::connect(config(&addr, "Alice")).await;
    assert!(matches!(second, Err(ClientError::NameTaken(n)) if n == "Alice"));

    let _bob = join(&addr, "Bob").await;
    assert_eq!(hub.peer_names().await, ["Alice", "Bob"]);

    // Alice hears about Bob, and never about the rejected duplicate.
    let joined = next(&mut joins).await;
    assert_eq!(joined.sender(), "Bob");
    assert!(joins.try_recv().is_err());
}

#[tokio::test]
async fn test_disconnect_frees_name() {
    let (hub, addr) = start_server().await;

    let alice = join(&addr, "Alice").await;
    alice.shutdown().await;
    wait_gone(&hub, "Alice").await;

    let again = join(&addr, "Alice").await;
    assert!(again.is_connected().await);
    assert_eq!(hub.peer_names().await, ["Alice"]);
}

#[tokio::test]
async fn test_malformed_frame_before_identity_is_skipped() {
    let (hub, addr) = start_server().await;

    let raw = WebSocketConnection::connect(&addr).await.unwrap();
    raw.send(b"garbage").await.unwrap();

    let identity = Envelope::with_content(
        "Carol",
        MessageType::Connexion,
        Purpose::Name,
        &JsonCodec,
        &"Carol".to_string(),
    )
    .unwrap();
    raw.send(&JsonCodec.encode(&identity).unwrap()).await.unwrap();

    let bytes = tokio::time::timeout(Duration::from_secs(2), raw.recv())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let reply: Envelope = JsonCodec.decode(&bytes).unwrap();
    assert_eq!(reply.id(), identity.id());
    assert_eq!(reply.sender(), SERVER_SENDER);
    assert!(reply.is_ack_ok(&JsonCodec));
    assert!(hub.contains("Carol").await);
}

// =========================================================================
// Relaying
// =========================================================================

#[tokio::test]
async fn test_chat_fans_out_without_echo() {
    let (_hub, addr) = start_server().await;

    let alice = join(&addr, "Alice").await;
    let bob = join(&addr, "Bob").await;
    let carol = join(&addr, "Carol").await;

    let mut alice_chat = alice.subscribe(MessageType::Chat, Purpose::Message).await.unwrap();
    let mut bob_chat = bob.subscribe(MessageType::Chat, Purpose::Message).await.unwrap();
    let mut carol_chat = carol.subscribe(MessageType::Chat, Purpose::Message).await.unwrap();

    alice.send_chat("hello").await.unwrap();

    for rx in [&mut bob_chat, &mut carol_chat] {
        let env = next(rx).await;
        assert_eq!(env.sender(), "Alice");
        let text: String = env.content(&JsonCodec).unwrap().unwrap();
        assert_eq!(text, "hello");
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(alice_chat.try_recv().is_err(), "sender must not get an echo");
}

#[tokio::test]
async fn test_relay_survives_lost_peer() {
    let (hub, addr) = start_server().await;

    let alice = join(&addr, "Alice").await;
    let bob = join(&addr, "Bob").await;
    let carol = join(&addr, "Carol").await;
    let mut bob_chat = bob.subscribe(MessageType::Chat, Purpose::Message).await.unwrap();

    carol.shutdown().await;
    drop(carol);
    wait_gone(&hub, "Carol").await;

    alice.send_chat("still here").await.unwrap();
    let env = next(&mut bob_chat).await;
    assert_eq!(env.sender(), "Alice");
}

#[tokio::test]
async fn test_game_request_answered_by_peer() {
    let (_hub, addr) = start_server().await;

    let host = join(&addr, "Alice").await;
    let bob = join(&addr, "Bob").await;

    let mut asks = host
        .subscribe(MessageType::Game, Purpose::GetDonjonDiscard)
        .await
        .unwrap();
    let pile = DiscardPile(vec![
        Card { name: "Goblin".into(), level: 1 },
        Card { name: "Dragon".into(), level: 9 },
    ]);
    let answer = pile.clone();
    let responder = host.clone();
    tokio::spawn(async move {
        while let Some(ask) = asks.recv().await {
            responder.reply(&ask, &answer).await.unwrap();
        }
    });

    let got: DiscardPile = bob.donjon_discard().await.expect("host should answer");
    assert_eq!(got, pile);
}

#[tokio::test]
async fn test_unanswered_request_retried_once_then_times_out() {
    let (_hub, addr) = start_server().await;

    let alice = ClientSession::connect(
        config(&addr, "Alice")
            .request_timeout(Duration::from_millis(150))
            .request_retries(1),
    )
    .await
    .unwrap();

    match alice.request(MessageType::Game, Purpose::GetPlayerList).await {
        Err(ClientError::Timeout { route, attempts }) => {
            assert_eq!(route, RouteKey::new(MessageType::Game, Purpose::GetPlayerList));
            assert_eq!(attempts, 2);
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_in_process_host_answers_through_hub() {
    let (hub, addr) = start_server().await;

    let mut relayed = hub.subscribe().await;
    let host = hub.clone();
    tokio::spawn(async move {
        while let Some(Relayed { origin, envelope }) = relayed.recv().await {
            if envelope.is_route(&MessageType::Game, &Purpose::InitGame) {
                let reply =
                    Envelope::reply_to(&envelope, SERVER_SENDER, &JsonCodec, &true).unwrap();
                host.send_to(&origin, reply).await.unwrap();
            }
        }
    });

    let alice = join(&addr, "Alice").await;
    assert!(alice.init_game().await.expect("host should answer"));
}
