//! Message decoder
//!
//! Turns a raw text frame into a typed `Message` through a table of
//! per-kind factories. The table is filled explicitly, either one kind at a
//! time with `register` or all relay kinds at once with `MessageDecoder::relay`.
//! A frame whose kind is not in the table, or whose body does not match the
//! kind, is a `Decode` error for that frame only.

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::broker::message::{
    ControlCommand, GeoPosition, GyroStatus, Message, MessageKind, MotorControl, MotorStatus,
    PidFrequencyStatus, PidTuningStatus, PidTuningUpdate, Reading,
};
use crate::client::ConnectionId;
use crate::transport::message::{
    AuthenticationData, Envelope, IntroductionData, SubscriptionStatusData,
};
use crate::utils::RelayError;

/// Builds a `MessageKind` from an envelope's `data` and the raw frame text.
pub type Factory = fn(Value, &str) -> Result<MessageKind, serde_json::Error>;

#[derive(Clone, Default)]
pub struct MessageDecoder {
    factories: HashMap<&'static str, Factory>,
}

impl MessageDecoder {
    /// A decoder with an empty table; every frame fails until kinds are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// A decoder that understands every inbound kind of the relay protocol.
    pub fn relay() -> Self {
        let mut decoder = Self::new();
        decoder.register("authentication", authentication);
        decoder.register("introduction", introduction);
        decoder.register("geo-position", report::<GeoPosition>);
        decoder.register("gyro-status", report::<GyroStatus>);
        decoder.register("motor-status", report::<MotorStatus>);
        decoder.register("pid-frequency-status", report::<PidFrequencyStatus>);
        decoder.register("pid-tuning-status", report::<PidTuningStatus>);
        decoder.register("request-topic-status", request_topic_status);
        decoder.register("subscription-status", subscription_status);
        decoder.register("motor-control", control::<MotorControl>);
        decoder.register("pid-tuning-update", control::<PidTuningUpdate>);
        decoder
    }

    /// Add or replace the factory for `kind`.
    pub fn register(&mut self, kind: &'static str, factory: Factory) {
        self.factories.insert(kind, factory);
    }

    pub fn decode(&self, raw: &str, sender: ConnectionId) -> Result<Message, RelayError> {
        let envelope: Envelope = serde_json::from_str(raw)
            .map_err(|e| RelayError::Decode(format!("malformed envelope: {e}")))?;
        let factory = self
            .factories
            .get(envelope.kind.as_str())
            .ok_or_else(|| {
                RelayError::Decode(format!("unregistered message type '{}'", envelope.kind))
            })?;
        let kind = factory(envelope.data, raw).map_err(|e| {
            RelayError::Decode(format!("invalid '{}' payload: {e}", envelope.kind))
        })?;
        Ok(Message { sender, kind })
    }
}

impl fmt::Debug for MessageDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.factories.keys().collect();
        kinds.sort();
        f.debug_struct("MessageDecoder").field("kinds", &kinds).finish()
    }
}

fn authentication(data: Value, _raw: &str) -> Result<MessageKind, serde_json::Error> {
    let AuthenticationData { token } = serde_json::from_value(data)?;
    Ok(MessageKind::Authentication { token })
}

fn introduction(data: Value, _raw: &str) -> Result<MessageKind, serde_json::Error> {
    let IntroductionData { role } = serde_json::from_value(data)?;
    Ok(MessageKind::Introduction { role })
}

fn report<T>(data: Value, _raw: &str) -> Result<MessageKind, serde_json::Error>
where
    T: DeserializeOwned + Into<Reading>,
{
    let reading: T = serde_json::from_value(data)?;
    Ok(MessageKind::Report(reading.into()))
}

fn request_topic_status(_data: Value, _raw: &str) -> Result<MessageKind, serde_json::Error> {
    Ok(MessageKind::RequestTopicStatus)
}

fn subscription_status(data: Value, _raw: &str) -> Result<MessageKind, serde_json::Error> {
    let SubscriptionStatusData { subscriptions } = serde_json::from_value(data)?;
    Ok(MessageKind::SubscriptionStatus { subscriptions })
}

// The body is only parsed to reject garbage; the raw frame is what gets forwarded.
fn control<T: ControlCommand>(data: Value, raw: &str) -> Result<MessageKind, serde_json::Error> {
    serde_json::from_value::<T>(data)?;
    Ok(MessageKind::Control {
        command: T::KIND,
        raw: raw.to_string(),
    })
}
