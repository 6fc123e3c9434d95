//! Message definitions for the broker
//!
//! `Reading` is the telemetry sample stored in topic repositories; its serde
//! form (`{"type": "<topic>", "data": {...}}`) is both the inbound report and
//! the `reading` field of outbound topic updates.
//!
//! `Message` is what the decoder hands the broker: a `MessageKind` plus the
//! connection it arrived on.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::broker::topic::Topic;
use crate::client::{ConnectionId, Role};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GyroStatus {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorStatus {
    pub motor1: f64,
    pub motor2: f64,
    pub motor3: f64,
    pub motor4: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidFrequencyStatus {
    pub desired: f64,
    pub current: f64,
}

/// Proportional/integral/derivative gains for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidTuning {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidTuningStatus {
    pub yaw: PidTuning,
    pub roll: PidTuning,
    pub pitch: PidTuning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum Reading {
    GeoPosition(GeoPosition),
    GyroStatus(GyroStatus),
    MotorStatus(MotorStatus),
    PidFrequencyStatus(PidFrequencyStatus),
    PidTuningStatus(PidTuningStatus),
}

impl Reading {
    pub fn topic(&self) -> Topic {
        match self {
            Reading::GeoPosition(_) => Topic::GeoPosition,
            Reading::GyroStatus(_) => Topic::GyroStatus,
            Reading::MotorStatus(_) => Topic::MotorStatus,
            Reading::PidFrequencyStatus(_) => Topic::PidFrequencyStatus,
            Reading::PidTuningStatus(_) => Topic::PidTuningStatus,
        }
    }
}

impl From<GeoPosition> for Reading {
    fn from(value: GeoPosition) -> Self {
        Reading::GeoPosition(value)
    }
}

impl From<GyroStatus> for Reading {
    fn from(value: GyroStatus) -> Self {
        Reading::GyroStatus(value)
    }
}

impl From<MotorStatus> for Reading {
    fn from(value: MotorStatus) -> Self {
        Reading::MotorStatus(value)
    }
}

impl From<PidFrequencyStatus> for Reading {
    fn from(value: PidFrequencyStatus) -> Self {
        Reading::PidFrequencyStatus(value)
    }
}

impl From<PidTuningStatus> for Reading {
    fn from(value: PidTuningStatus) -> Self {
        Reading::PidTuningStatus(value)
    }
}

/// Commands the relay forwards verbatim to a single role holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    MotorControl,
    PidTuningUpdate,
}

impl ControlKind {
    /// The role whose holder receives this command.
    pub fn target_role(&self) -> Role {
        match self {
            ControlKind::MotorControl => Role::OrientationControl,
            ControlKind::PidTuningUpdate => Role::ManualControl,
        }
    }
}

/// Typed body of a control command, used to validate it before forwarding.
pub trait ControlCommand: DeserializeOwned {
    const KIND: ControlKind;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorControl {
    pub throttle: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl ControlCommand for MotorControl {
    const KIND: ControlKind = ControlKind::MotorControl;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidTuningUpdate {
    pub yaw: PidTuning,
    pub roll: PidTuning,
    pub pitch: PidTuning,
}

impl ControlCommand for PidTuningUpdate {
    const KIND: ControlKind = ControlKind::PidTuningUpdate;
}

/// A (topic, last received revision) pair as reported by a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionCursor {
    pub topic: Topic,
    pub revision: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageKind {
    Authentication { token: String },
    Introduction { role: Role },
    Report(Reading),
    RequestTopicStatus,
    SubscriptionStatus { subscriptions: Vec<SubscriptionCursor> },
    /// `raw` is the payload exactly as received.
    Control { command: ControlKind, raw: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub sender: ConnectionId,
    pub kind: MessageKind,
}
