use super::{AuthState, Client, Connection, ConnectionId, Role};
use crate::broker::topic::Topic;
use crate::utils::RelayError;
use tokio::sync::mpsc;
use tungstenite::protocol::Message as WsMessage;

fn new_client() -> (Client, mpsc::UnboundedReceiver<WsMessage>) {
    let (tx, rx) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(Connection::new(ConnectionId::next(), tx));
    (client, rx)
}

#[test]
fn test_client_new() {
    let (client, _rx) = new_client();
    assert!(!client.id.is_empty());
    assert_eq!(client.state(), AuthState::Unauthenticated);
    assert!(!client.is_authenticated());
    assert!(client.subscriptions().is_empty());
}

#[test]
fn test_authenticate_with_matching_secret() {
    let (mut client, _rx) = new_client();
    client.authenticate_with("s3cret", "s3cret").unwrap();
    assert_eq!(client.state(), AuthState::Authenticated);
    assert!(client.is_authenticated());
    assert_eq!(client.role(), None);
}

#[test]
fn test_authenticate_with_wrong_secret_keeps_state() {
    let (mut client, _rx) = new_client();
    let err = client.authenticate_with("guess", "s3cret").unwrap_err();
    assert!(matches!(err, RelayError::Unauthorized(_)));
    assert_eq!(client.state(), AuthState::Unauthenticated);
}

#[test]
fn test_empty_secret_never_matches() {
    let (mut client, _rx) = new_client();
    assert!(client.authenticate_with("", "").is_err());
    assert!(!client.is_authenticated());
}

#[test]
fn test_assign_role_requires_authentication() {
    let (mut client, _rx) = new_client();
    let err = client.assign_role(Role::Monitor).unwrap_err();
    assert!(matches!(err, RelayError::Unauthorized(_)));
    assert_eq!(client.role(), None);

    client.authenticate_with("s3cret", "s3cret").unwrap();
    client.assign_role(Role::Monitor).unwrap();
    assert_eq!(client.state(), AuthState::RoleAssigned(Role::Monitor));
}

#[test]
fn test_reauthentication_keeps_role() {
    let (mut client, _rx) = new_client();
    client.authenticate_with("s3cret", "s3cret").unwrap();
    client.assign_role(Role::ManualControl).unwrap();
    client.authenticate_with("s3cret", "s3cret").unwrap();
    assert_eq!(client.role(), Some(Role::ManualControl));
}

#[test]
fn test_cursor_never_moves_backwards() {
    let (mut client, _rx) = new_client();
    client.record_subscription_cursor(Topic::GeoPosition, 3);
    client.record_subscription_cursor(Topic::GeoPosition, 1);
    assert_eq!(client.cursor(Topic::GeoPosition), Some(3));
    client.record_subscription_cursor(Topic::GeoPosition, 4);
    assert_eq!(client.cursor(Topic::GeoPosition), Some(4));
}

#[test]
fn test_replace_subscriptions_drops_old_topics() {
    let (mut client, _rx) = new_client();
    client.record_subscription_cursor(Topic::GyroStatus, 2);
    client.replace_subscriptions([(Topic::MotorStatus, 0)]);
    assert_eq!(client.cursor(Topic::GyroStatus), None);
    assert_eq!(client.cursor(Topic::MotorStatus), Some(0));
}

#[test]
fn test_connection_send_and_close() {
    let (client, mut rx) = new_client();
    client.connection().send("hello").unwrap();
    client.connection().close();

    match rx.try_recv().unwrap() {
        WsMessage::Text(text) => assert_eq!(text.as_str(), "hello"),
        other => panic!("Expected a text message, got {:?}", other),
    }
    assert!(matches!(rx.try_recv().unwrap(), WsMessage::Close(None)));
}

#[test]
fn test_connection_send_after_receiver_dropped() {
    let (client, rx) = new_client();
    drop(rx);
    let err = client.connection().send("hello").unwrap_err();
    assert!(matches!(err, RelayError::ConnectionClosed(_)));
    assert!(client.connection().is_closed());
}

#[test]
fn test_connection_identity() {
    let (tx, _rx) = mpsc::unbounded_channel::<WsMessage>();
    let id = ConnectionId::new(42);
    let a = Connection::new(id, tx.clone());
    let b = Connection::new(id, tx.clone());
    let c = Connection::new(ConnectionId::new(43), tx);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(id.to_string(), "conn-42");
    assert!(ConnectionId::next() < ConnectionId::next());
}
