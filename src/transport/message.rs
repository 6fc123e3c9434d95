//! Wire protocol
//!
//! Every frame is a JSON envelope `{"type": "<kind>", "data": {...}}`. Inbound
//! bodies are decoded by `decoder::MessageDecoder`; outbound frames are
//! `ServerMessage` values, one per WebSocket frame.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::broker::message::{Reading, SubscriptionCursor};
use crate::broker::registry::{TopicStatusEntry, TopicStatusRegistry};
use crate::broker::topic::Topic;
use crate::client::Role;

/// Raw envelope; `data` is left untouched for the kind's factory.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AuthenticationData {
    pub token: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct IntroductionData {
    pub role: Role,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SubscriptionStatusData {
    pub subscriptions: Vec<SubscriptionCursor>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// One newly available revision of a subscribed topic.
    TopicUpdate {
        topic: Topic,
        revision: u64,
        received_at: DateTime<Utc>,
        reading: Reading,
    },
    TopicStatus {
        topics: Vec<TopicStatusEntry>,
    },
    /// Reason for a forced disconnect, sent right before the close frame.
    Error { message: String },
}

impl ServerMessage {
    pub fn topic_status(registry: &TopicStatusRegistry) -> Self {
        ServerMessage::TopicStatus {
            topics: registry.status(),
        }
    }
}
