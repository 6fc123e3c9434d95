//! WebSocket transport
//!
//! Accepts TCP/WebSocket connections and feeds their frames to the shared
//! `Broker`. Responsibilities:
//! - give each connection a `ConnectionId` and register its `Client`
//! - run a writer task that drains the client's channel into the socket
//! - hand every text frame to `Broker::handle_payload`, one at a time under
//!   the broker lock
//! - stop reading once the broker has dropped the client, and remove the
//!   client when the peer goes away
//!
//! Idle peers are not timed out here.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::Broker;
use crate::client::{Connection, ConnectionId};
use crate::config::ServerSettings;
use crate::utils::RelayError;

pub type SharedBroker = Arc<Mutex<Broker>>;

/// Lock the broker. A panic while holding the lock leaves the state as
/// consistent as the last completed message, so poisoning is ignored.
pub fn lock_broker(broker: &SharedBroker) -> MutexGuard<'_, Broker> {
    broker.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Bind `addr` and serve until the listener fails.
pub async fn start_websocket_server(
    addr: &str,
    broker: SharedBroker,
    settings: ServerSettings,
) -> Result<(), RelayError> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener, broker, settings).await
}

/// Accept loop over an already bound listener.
pub async fn serve(
    listener: TcpListener,
    broker: SharedBroker,
    settings: ServerSettings,
) -> Result<(), RelayError> {
    info!("relay listening on ws://{}", listener.local_addr()?);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
                continue;
            }
        };
        tokio::spawn(handle_connection(
            stream,
            peer,
            broker.clone(),
            settings.max_connections,
        ));
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    broker: SharedBroker,
    max_connections: usize,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%peer, error = %e, "WebSocket handshake error");
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let connection_id = ConnectionId::next();

    let admitted = {
        let mut guard = lock_broker(&broker);
        if guard.client_count() >= max_connections {
            None
        } else {
            Some(guard.register_client(Connection::new(connection_id, tx)))
        }
    };
    let Some(client_id) = admitted else {
        warn!(%peer, max_connections, "connection limit reached, refusing peer");
        let _ = ws_sender.send(WsMessage::Close(None)).await;
        return;
    };
    info!(connection = %connection_id, client = %client_id, %peer, "client connected");

    // Ends when the broker closes the connection or drops the client.
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = msg.is_close();
            if let Err(e) = ws_sender.send(msg).await {
                debug!(connection = %connection_id, error = %e, "failed to write frame");
                break;
            }
            if closing {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    while let Some(frame) = ws_receiver.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(e) => {
                debug!(connection = %connection_id, error = %e, "read error");
                break;
            }
        };
        let payload = match &msg {
            WsMessage::Text(text) => text.as_str(),
            WsMessage::Binary(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    warn!(connection = %connection_id, "dropping non UTF-8 binary frame");
                    continue;
                }
            },
            WsMessage::Close(_) => break,
            _ => continue,
        };

        let mut guard = lock_broker(&broker);
        guard.handle_payload(connection_id, payload);
        if !guard.is_connected(connection_id) {
            break;
        }
    }

    if lock_broker(&broker).remove_client(connection_id).is_some() {
        info!(connection = %connection_id, client = %client_id, "client disconnected");
    }
    let _ = writer.await;
}
