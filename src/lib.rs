//! # SkyRelay
//!
//! `skyrelay` is the message-routing core of a telemetry relay that sits
//! between flight-control peers and monitoring peers. Peers connect over
//! WebSockets, authenticate with a shared secret, introduce themselves with a
//! role, report telemetry readings and subscribe to topics. The relay stores
//! every reading in an in-memory, revision-numbered repository per topic and
//! catches each subscriber up from its last received revision.
//!
//! ## Core Modules
//!
//! - `broker`: topic repositories, the status registry and the `Broker` engine
//!   that dispatches messages and fulfills subscriptions.
//! - `client`: a connected peer, its authentication state and cursors.
//! - `config`: loading server and relay settings.
//! - `transport`: the JSON wire protocol, the decoder table and the WebSocket server.
//! - `utils`: the shared error type and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod transport;
pub mod utils;
