//! Outbound half of a peer connection.
//!
//! The transport owns the socket; the broker only ever sees a `Connection`,
//! which pushes frames into the per-connection channel drained by the
//! transport's writer task.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::UnboundedSender;
use tungstenite::protocol::Message as WsMessage;

use crate::transport::message::ServerMessage;
use crate::utils::RelayError;

/// Identity of a single transport connection. Ids are handed out in
/// increasing order, so ordering by id is ordering by connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Allocate a process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    sender: UnboundedSender<WsMessage>,
}

impl Connection {
    pub fn new(id: ConnectionId, sender: UnboundedSender<WsMessage>) -> Self {
        Self { id, sender }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue one text frame for the peer.
    pub fn send(&self, text: impl Into<String>) -> Result<(), RelayError> {
        self.sender
            .send(WsMessage::text(text.into()))
            .map_err(|_| RelayError::ConnectionClosed(self.id))
    }

    /// Serialize and queue a single outbound message.
    pub fn send_message(&self, message: &ServerMessage) -> Result<(), RelayError> {
        let text = serde_json::to_string(message)?;
        self.send(text)
    }

    /// Ask the writer task to send a close frame and stop.
    pub fn close(&self) {
        let _ = self.sender.send(WsMessage::Close(None));
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Connection {}
