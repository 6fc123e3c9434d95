//! The `client` module defines the representation of a connected peer.
//!
//! It provides the `Client` struct with its authentication state machine and
//! subscription cursors, and the `Connection` handle used to push frames to
//! the peer.

pub mod connection;
pub mod relay_client;

pub use connection::{Connection, ConnectionId};
pub use relay_client::{AuthState, Client, Role};

#[cfg(test)]
mod tests;
