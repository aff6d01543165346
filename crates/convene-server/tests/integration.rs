//! End-to-end tests using a real WebSocket client.

use std::sync::Arc;
use std::time::Duration;

use convene_core::{ConnectionId, GroupId, GroupRecord, UserId};
use convene_server::{ConveneServer, ServerConfig};
use convene_store::{ConnectionConfig, GroupStore, SqliteConnectionRegistry, SqliteGroupStore, open_pool};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

struct TestServer {
    ws_url: String,
    server: Arc<ConveneServer>,
    groups: SqliteGroupStore,
    registry: SqliteConnectionRegistry,
    serve_handle: tokio::task::JoinHandle<()>,
}

/// Boot a local-delivery server on an ephemeral port with group `G = {A, B}`.
async fn boot_server() -> TestServer {
    let config = ConnectionConfig::default();
    let groups = SqliteGroupStore::new(open_pool(":memory:", &config).unwrap());
    groups
        .upsert(GroupRecord::new(
            GroupId::from("G"),
            [UserId::from("A"), UserId::from("B")],
        ))
        .await
        .unwrap();
    let registry = SqliteConnectionRegistry::new(open_pool(":memory:", &config).unwrap());

    let server = Arc::new(ConveneServer::local(
        ServerConfig::default(),
        Arc::new(groups.clone()),
        Arc::new(registry.clone()),
    ));
    let (addr, serve_handle) = server.listen().await.unwrap();

    TestServer {
        ws_url: format!("ws://{addr}/ws"),
        server,
        groups,
        registry,
        serve_handle,
    }
}

async fn recv_json(ws: &mut WsStream) -> Value {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Connect and return the stream plus the server-assigned connection id.
async fn connect(url: &str) -> (WsStream, String) {
    let (mut ws, _) = connect_async(url).await.unwrap();
    let hello = recv_json(&mut ws).await;
    assert_eq!(hello["type"], "connection.established");
    let id = hello["data"]["connectionId"].as_str().unwrap().to_owned();
    (ws, id)
}

async fn send_join(ws: &mut WsStream, group: &str, user: &str) {
    let frame = json!({"action": "joinChat", "groupId": group, "userId": user});
    ws.send(Message::Text(frame.to_string().into())).await.unwrap();
}

/// Read `n` frames, split into (replies, notifications).
async fn recv_frames(ws: &mut WsStream, n: usize) -> (Vec<Value>, Vec<Value>) {
    let mut replies = Vec::new();
    let mut notifications = Vec::new();
    for _ in 0..n {
        let frame = recv_json(ws).await;
        if frame["action"] == "userJoined" {
            notifications.push(frame);
        } else {
            replies.push(frame);
        }
    }
    (replies, notifications)
}

#[tokio::test]
async fn connection_ids_are_unique() {
    let t = boot_server().await;
    let (_a, id_a) = connect(&t.ws_url).await;
    let (_b, id_b) = connect(&t.ws_url).await;
    assert_ne!(id_a, id_b);
    assert!(id_a.starts_with("conn_"));
}

#[tokio::test]
async fn joiner_gets_reply_and_own_notification() {
    let t = boot_server().await;
    let (mut ws, id) = connect(&t.ws_url).await;

    send_join(&mut ws, "G", "A").await;
    let (replies, notifications) = recv_frames(&mut ws, 2).await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["statusCode"], 200);
    assert_eq!(replies[0]["action"], "joinChat");
    assert_eq!(replies[0]["message"], "Joined chat successfully");

    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["userId"], "A");
    assert_eq!(notifications[0]["groupId"], "G");
    assert_eq!(notifications[0]["message"], "A has joined the chat");

    let record = t.groups.get(&GroupId::from("G")).await.unwrap().unwrap();
    assert!(record.is_connected(&UserId::from("A")));
    assert!(t.registry.get(&ConnectionId::from(id)).await.unwrap().is_some());
}

#[tokio::test]
async fn peers_are_notified_of_later_joins() {
    let t = boot_server().await;
    let (mut ws_a, _) = connect(&t.ws_url).await;
    let (mut ws_b, _) = connect(&t.ws_url).await;

    send_join(&mut ws_a, "G", "A").await;
    let _ = recv_frames(&mut ws_a, 2).await;

    send_join(&mut ws_b, "G", "B").await;
    let (replies, notifications) = recv_frames(&mut ws_b, 2).await;
    assert_eq!(replies[0]["statusCode"], 200);
    assert_eq!(notifications[0]["userId"], "B");

    let to_a = recv_json(&mut ws_a).await;
    assert_eq!(to_a["action"], "userJoined");
    assert_eq!(to_a["userId"], "B");
    assert_eq!(to_a["message"], "B has joined the chat");
}

#[tokio::test]
async fn non_member_is_refused() {
    let t = boot_server().await;
    let (mut ws, id) = connect(&t.ws_url).await;

    send_join(&mut ws, "G", "mallory").await;
    let reply = recv_json(&mut ws).await;
    assert_eq!(reply["statusCode"], 403);
    assert_eq!(reply["message"], "User is not a member of this group");

    let record = t.groups.get(&GroupId::from("G")).await.unwrap().unwrap();
    assert!(record.users_connected.is_empty());
    assert!(t.registry.get(&ConnectionId::from(id)).await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_group_is_not_found() {
    let t = boot_server().await;
    let (mut ws, _) = connect(&t.ws_url).await;

    send_join(&mut ws, "missing", "A").await;
    let reply = recv_json(&mut ws).await;
    assert_eq!(reply["statusCode"], 404);
    assert_eq!(reply["message"], "Group not found");
}

#[tokio::test]
async fn disconnect_removes_connection_but_keeps_connected_set() {
    let t = boot_server().await;
    let (mut ws, id) = connect(&t.ws_url).await;
    send_join(&mut ws, "G", "A").await;
    let _ = recv_frames(&mut ws, 2).await;
    assert_eq!(t.registry.count().await.unwrap(), 1);

    ws.close(None).await.unwrap();

    let connection_id = ConnectionId::from(id);
    let removed = timeout(TIMEOUT, async {
        loop {
            if t.registry.get(&connection_id).await.unwrap().is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(removed.is_ok(), "connection record was not removed");

    let channels = t.server.channels().unwrap();
    assert_eq!(channels.connection_count().await, 0);

    let record = t.groups.get(&GroupId::from("G")).await.unwrap().unwrap();
    assert!(record.is_connected(&UserId::from("A")));
}

#[tokio::test]
async fn malformed_frame_gets_bad_request() {
    let t = boot_server().await;
    let (mut ws, _) = connect(&t.ws_url).await;

    ws.send(Message::Text("{not json".into())).await.unwrap();
    let reply = recv_json(&mut ws).await;
    assert_eq!(reply["statusCode"], 400);
}

#[tokio::test]
async fn shutdown_closes_sessions() {
    let t = boot_server().await;
    let (mut ws, _) = connect(&t.ws_url).await;

    t.server.shutdown().shutdown();

    let closed = timeout(TIMEOUT, async {
        loop {
            match ws.next().await {
                None | Some(Err(_) | Ok(Message::Close(_))) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok());
}

#[tokio::test]
async fn graceful_shutdown_drains_sessions_and_their_records() {
    let t = boot_server().await;
    let (mut ws_a, _) = connect(&t.ws_url).await;
    let (mut ws_b, _) = connect(&t.ws_url).await;
    send_join(&mut ws_a, "G", "A").await;
    let _ = recv_frames(&mut ws_a, 2).await;
    send_join(&mut ws_b, "G", "B").await;
    let _ = recv_frames(&mut ws_b, 2).await;
    assert_eq!(t.registry.count().await.unwrap(), 2);

    let drained = t
        .server
        .shutdown()
        .graceful_shutdown(vec![t.serve_handle])
        .await;

    assert!(drained);
    assert_eq!(t.registry.count().await.unwrap(), 0);
    assert_eq!(t.server.channels().unwrap().connection_count().await, 0);
}
