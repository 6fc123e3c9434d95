//! The `transport` module handles network communication with peers over
//! WebSockets.
//!
//! It defines the JSON wire protocol, the decoder table that turns inbound
//! frames into broker messages, and the WebSocket server that owns sockets
//! and forwards frames to the broker.

pub mod decoder;
pub mod message;
pub mod websocket;


#[cfg(test)]
mod websocket_tests;
