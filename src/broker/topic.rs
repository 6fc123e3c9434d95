//! Topic repositories
//!
//! Every telemetry topic owns exactly one `TopicRepository`, an append-only
//! log of readings numbered from revision 1 without gaps. Revision `n` always
//! lives at index `n - 1`, which is what lets `get` start reading in O(1).
//!
//! Concurrency note: repositories are only reachable through the broker lock,
//! and `add` takes `&mut self`, so a reader can never see a half-written entry.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::broker::message::Reading;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    GeoPosition,
    GyroStatus,
    MotorStatus,
    PidFrequencyStatus,
    PidTuningStatus,
}

impl Topic {
    pub const ALL: [Topic; 5] = [
        Topic::GeoPosition,
        Topic::GyroStatus,
        Topic::MotorStatus,
        Topic::PidFrequencyStatus,
        Topic::PidTuningStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::GeoPosition => "geo-position",
            Topic::GyroStatus => "gyro-status",
            Topic::MotorStatus => "motor-status",
            Topic::PidFrequencyStatus => "pid-frequency-status",
            Topic::PidTuningStatus => "pid-tuning-status",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored reading and the revision it was assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub revision: u64,
    pub reading: Reading,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct TopicRepository {
    topic: Topic,
    entries: Vec<Entry>,
}

impl TopicRepository {
    pub fn new(topic: Topic) -> Self {
        Self {
            topic,
            entries: Vec::new(),
        }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Append a reading and return its revision (previous highest + 1).
    pub fn add(&mut self, reading: Reading) -> u64 {
        debug_assert_eq!(reading.topic(), self.topic);
        let revision = self.highest_revision() + 1;
        self.entries.push(Entry {
            revision,
            reading,
            received_at: Utc::now(),
        });
        revision
    }

    /// Entries with `revision >= from_revision`, oldest first.
    ///
    /// Each call yields an independent iterator. Asking past the end yields
    /// nothing, and `0` is treated like `1`.
    pub fn get(&self, from_revision: u64) -> impl Iterator<Item = &Entry> + '_ {
        let start = usize::try_from(from_revision.saturating_sub(1)).unwrap_or(usize::MAX);
        self.entries.get(start..).unwrap_or_default().iter()
    }

    pub fn highest_revision(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn latest(&self) -> Option<&Entry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
