use crate::broker::message::{GeoPosition, Reading};
use crate::broker::topic::Topic;
use crate::broker::{Broker, TopicStatusRegistry};
use crate::config::Settings;
use crate::transport::decoder::MessageDecoder;
use crate::transport::message::ServerMessage;
use crate::transport::websocket::{SharedBroker, lock_broker, serve};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Ws = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const SECRET: &str = "flight-secret";

async fn start_server(max_connections: usize) -> (String, SharedBroker) {
    let mut settings = Settings::default().server;
    settings.max_connections = max_connections;
    let addr = format!(
        "127.0.0.1:{}",
        portpicker::pick_unused_port().expect("No free ports")
    );
    let broker = Arc::new(Mutex::new(Broker::new(
        SECRET,
        MessageDecoder::relay(),
        TopicStatusRegistry::with_all_topics(),
    )));
    let listener = TcpListener::bind(&addr).await.expect("bind");
    tokio::spawn(serve(listener, broker.clone(), settings));
    (format!("ws://{addr}"), broker)
}

async fn connect(url: &str) -> Ws {
    let (ws, _) = tokio_tungstenite::connect_async(url)
        .await
        .expect("WebSocket handshake failed");
    ws
}

async fn send_json(ws: &mut Ws, value: serde_json::Value) {
    ws.send(WsMessage::Text(value.to_string().into()))
        .await
        .expect("send failed");
}

async fn next_server_message(ws: &mut Ws) -> ServerMessage {
    let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("stream ended")
        .expect("read failed");
    let raw = frame.into_data();
    serde_json::from_slice(&raw)
        .unwrap_or_else(|e| panic!("Failed to deserialize ServerMessage from '{:?}': {}", raw, e))
}

async fn wait_for_clients(broker: &SharedBroker, count: usize) {
    for _ in 0..50 {
        if lock_broker(broker).client_count() == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("broker never reached {count} clients");
}

#[tokio::test]
async fn test_subscriber_receives_reading_end_to_end() {
    let (url, broker) = start_server(100).await;
    let mut monitor = connect(&url).await;
    let mut reporter = connect(&url).await;

    send_json(&mut monitor, json!({"type": "authentication", "data": {"token": SECRET}})).await;
    send_json(
        &mut monitor,
        json!({"type": "subscription-status", "data": {"subscriptions": [{"topic": "geo-position", "revision": 0}]}}),
    )
    .await;
    // the monitor's frames must be processed before the reading arrives
    send_json(&mut monitor, json!({"type": "request-topic-status"})).await;
    let status = next_server_message(&mut monitor).await;
    assert!(matches!(status, ServerMessage::TopicStatus { .. }));

    send_json(
        &mut reporter,
        json!({"type": "geo-position", "data": {"latitude": 47.0, "longitude": 8.0, "altitude": 500.0}}),
    )
    .await;

    match next_server_message(&mut monitor).await {
        ServerMessage::TopicUpdate {
            topic,
            revision,
            reading,
            ..
        } => {
            assert_eq!(topic, Topic::GeoPosition);
            assert_eq!(revision, 1);
            assert_eq!(
                reading,
                Reading::GeoPosition(GeoPosition {
                    latitude: 47.0,
                    longitude: 8.0,
                    altitude: 500.0,
                })
            );
        }
        other => panic!("Expected TopicUpdate, got {:?}", other),
    }
    wait_for_clients(&broker, 2).await;
}

#[tokio::test]
async fn test_wrong_token_closes_connection() {
    let (url, broker) = start_server(100).await;
    let mut peer = connect(&url).await;
    wait_for_clients(&broker, 1).await;

    send_json(&mut peer, json!({"type": "authentication", "data": {"token": "wrong"}})).await;

    match next_server_message(&mut peer).await {
        ServerMessage::Error { message } => assert!(message.contains("wrong token")),
        other => panic!("Expected Error, got {:?}", other),
    }
    let closed = tokio::time::timeout(Duration::from_secs(2), peer.next())
        .await
        .expect("timed out waiting for close");
    assert!(matches!(closed, Some(Ok(WsMessage::Close(_))) | None | Some(Err(_))));
    wait_for_clients(&broker, 0).await;
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    let (url, broker) = start_server(100).await;
    let mut peer = connect(&url).await;

    peer.send(WsMessage::Text("not json".to_string().into())).await.unwrap();
    send_json(&mut peer, json!({"type": "authentication", "data": {"token": SECRET}})).await;
    send_json(&mut peer, json!({"type": "request-topic-status"})).await;

    match next_server_message(&mut peer).await {
        ServerMessage::TopicStatus { topics } => assert_eq!(topics.len(), Topic::ALL.len()),
        other => panic!("Expected TopicStatus, got {:?}", other),
    }
    wait_for_clients(&broker, 1).await;
}

#[tokio::test]
async fn test_binary_frames_reach_broker_unless_invalid_utf8() {
    let (url, broker) = start_server(100).await;
    let mut peer = connect(&url).await;

    let auth = json!({"type": "authentication", "data": {"token": SECRET}}).to_string();
    peer.send(WsMessage::binary(auth.into_bytes())).await.unwrap();
    peer.send(WsMessage::binary(vec![0xff, 0xfe, 0xfd])).await.unwrap();
    send_json(&mut peer, json!({"type": "request-topic-status"})).await;

    match next_server_message(&mut peer).await {
        ServerMessage::TopicStatus { topics } => assert_eq!(topics.len(), Topic::ALL.len()),
        other => panic!("Expected TopicStatus, got {:?}", other),
    }
    wait_for_clients(&broker, 1).await;
}

#[tokio::test]
async fn test_disconnect_removes_client() {
    let (url, broker) = start_server(100).await;
    let mut peer = connect(&url).await;
    wait_for_clients(&broker, 1).await;

    peer.close(None).await.unwrap();
    wait_for_clients(&broker, 0).await;
}

#[tokio::test]
async fn test_connection_limit_refuses_extra_peers() {
    let (url, broker) = start_server(1).await;
    let _first = connect(&url).await;
    wait_for_clients(&broker, 1).await;

    let mut second = connect(&url).await;
    let frame = tokio::time::timeout(Duration::from_secs(2), second.next())
        .await
        .expect("timed out waiting for close");
    assert!(matches!(frame, Some(Ok(WsMessage::Close(_))) | None | Some(Err(_))));
    assert_eq!(lock_broker(&broker).client_count(), 1);
}
