//! End-to-end test: a peerchat client against a small relay server built
//! directly on `tokio-tungstenite`.
//!
//! The server speaks the real wire format (channel-tagged frames carrying
//! catalog packets), so this exercises every layer at once.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use peerchat::prelude::*;
use peerchat::transport::{decode_frame, encode_frame};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

const SID: SessionId = SessionId([0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7]);
const STEP: Duration = Duration::from_secs(5);

/// What the server saw from the client.
#[derive(Debug, Default)]
struct ServerLog {
    hello: Option<Option<SessionId>>,
    messages: Vec<String>,
    names: Vec<String>,
    beats: usize,
    beats_on_reliable: usize,
    goodbye: bool,
}

async fn send(ws: &mut ServerWs, msg: ServerMessage) {
    let frame = encode_frame(Channel::ReliableOrdered, &msg.encode());
    ws.send(Message::Binary(frame.into())).await.unwrap();
}

/// Accepts one client and plays the server side until the socket closes.
async fn relay_server(listener: TcpListener) -> ServerLog {
    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
    let mut log = ServerLog::default();
    let mut username = "guest1".to_string();

    while let Some(Ok(msg)) = ws.next().await {
        let Message::Binary(frame) = msg else {
            continue;
        };
        let (channel, packet) = decode_frame(&frame).expect("tagged frame");
        match ClientMessage::decode(packet).expect("valid client packet") {
            ClientMessage::Hello { session_id } => {
                log.hello = Some(session_id);
                send(
                    &mut ws,
                    ServerMessage::HelloReply {
                        session_id: SID,
                        username: username.clone(),
                    },
                )
                .await;
                send(
                    &mut ws,
                    ServerMessage::LobbyInfo {
                        usernames: vec!["bob".into(), username.clone()],
                    },
                )
                .await;
            }
            ClientMessage::SendMsg { text } => {
                send(
                    &mut ws,
                    ServerMessage::ReceiveMsg {
                        text: format!("{username}: {text}"),
                    },
                )
                .await;
                log.messages.push(text);
            }
            ClientMessage::SetName { name } => {
                username = name.clone();
                send(&mut ws, ServerMessage::SetNameReply { username: name.clone() }).await;
                log.names.push(name);
            }
            ClientMessage::Buttons { .. } => {
                log.beats += 1;
                if channel.is_reliable() {
                    log.beats_on_reliable += 1;
                }
            }
            ClientMessage::Goodbye => log.goodbye = true,
        }
    }
    log
}

async fn pump_until(
    client: &mut PeerchatClient<Vec<PresenterEvent>>,
    what: &str,
    done: impl Fn(&PeerchatClient<Vec<PresenterEvent>>) -> bool,
) {
    timeout(STEP, async {
        while !done(client) {
            assert!(client.process_next_event().await, "events ended waiting for {what}");
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

#[tokio::test]
async fn test_chat_session_over_websocket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let server = tokio::spawn(relay_server(listener));

    let config = SessionConfig {
        heartbeat_interval: Duration::from_millis(20),
        ..Default::default()
    };
    let mut client = timeout(
        STEP,
        PeerchatClientBuilder::new()
            .url(url)
            .session_config(config)
            .connect(Vec::<PresenterEvent>::new()),
    )
    .await
    .expect("connect timed out")
    .expect("connect should succeed");
    assert_eq!(client.state(), ConnectionState::Connected);

    // --- Handshake ---
    pump_until(&mut client, "hello reply and roster", |c| {
        c.username().is_some() && !c.roster().is_empty()
    })
    .await;
    assert_eq!(client.username(), Some("guest1"));
    assert_eq!(client.session_id(), Some(SID));
    assert_eq!(client.roster(), &["bob", "guest1"]);
    assert!(client.is_heartbeat_running());

    // --- Name change ---
    client.send_name_change("alice").unwrap();
    pump_until(&mut client, "name reply", |c| c.username() == Some("alice")).await;

    // --- Chat round trip ---
    client.send_message("hello").unwrap();
    pump_until(&mut client, "echoed chat line", |c| {
        c.presenter()
            .contains(&PresenterEvent::LogLine("alice: hello".into()))
    })
    .await;

    // Let a few heartbeats go out.
    tokio::time::sleep(Duration::from_millis(100)).await;

    // --- Shutdown ---
    client.shutdown().await;
    assert_eq!(client.state(), ConnectionState::ClosedGraceful);
    assert!(client.send_message("late").is_err());

    let log = timeout(STEP, server)
        .await
        .expect("server did not see the socket close")
        .expect("server task panicked");
    assert_eq!(log.hello, Some(None));
    assert_eq!(log.names, vec!["alice"]);
    assert_eq!(log.messages, vec!["hello"]);
    assert!(log.beats >= 1, "no heartbeat reached the server");
    assert_eq!(log.beats_on_reliable, 0);
    assert!(log.goodbye);
}

#[tokio::test]
async fn test_connect_to_missing_server_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let result = PeerchatClientBuilder::new()
        .url(url)
        .connect(Vec::<PresenterEvent>::new())
        .await;
    assert!(matches!(
        result,
        Err(PeerchatError::Session(SessionError::ConnectionFailed(_)))
    ));
}

#[tokio::test]
async fn test_server_close_ends_session_gracefully() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        // Wait for the hello, then hang up.
        let _hello = ws.next().await;
        ws.send(Message::Close(None)).await.unwrap();
    });

    let mut client = PeerchatClientBuilder::new()
        .url(url)
        .connect(Vec::<PresenterEvent>::new())
        .await
        .unwrap();

    timeout(STEP, client.run()).await.expect("run did not return");
    assert_eq!(client.state(), ConnectionState::ClosedGraceful);
    assert!(client
        .presenter()
        .contains(&PresenterEvent::ConnectionState(ConnectionState::ClosedGraceful)));

    client.shutdown().await;
    timeout(STEP, server).await.unwrap().unwrap();
}
