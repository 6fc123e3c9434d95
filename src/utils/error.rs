//! The `error` module defines the error type shared by every layer of the relay.
//!
//! Per-message failures (`Decode`, `Unauthorized`, `UnknownClient`, `UnknownTopic`)
//! are caught by the broker at the top of its per-message entry point and never
//! terminate the process.

use thiserror::Error;

use crate::client::ConnectionId;

#[derive(Error, Debug)]
pub enum RelayError {
    /// The payload could not be turned into a known message.
    #[error("decode error: {0}")]
    Decode(String),

    /// A peer failed authentication or acted before authenticating.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// No client record exists for the connection a payload arrived on.
    #[error("no connected client found for connection {0}")]
    UnknownClient(ConnectionId),

    /// A message referenced a topic without a repository.
    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    /// The outbound side of a connection has already been released.
    #[error("connection {0} is closed")]
    ConnectionClosed(ConnectionId),

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
