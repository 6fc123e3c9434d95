//! Topic status registry
//!
//! Owns one repository per registered topic and produces the status snapshot
//! returned to `request-topic-status`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::broker::message::Reading;
use crate::broker::topic::{Topic, TopicRepository};
use crate::utils::RelayError;

/// Highest revision and newest reading of one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicStatusEntry {
    pub topic: Topic,
    pub revision: u64,
    pub reading: Option<Reading>,
}

#[derive(Debug)]
pub struct TopicStatusRegistry {
    repositories: BTreeMap<Topic, TopicRepository>,
}

impl TopicStatusRegistry {
    /// Register an empty repository for each of `topics`.
    pub fn new(topics: impl IntoIterator<Item = Topic>) -> Self {
        Self {
            repositories: topics
                .into_iter()
                .map(|topic| (topic, TopicRepository::new(topic)))
                .collect(),
        }
    }

    pub fn with_all_topics() -> Self {
        Self::new(Topic::ALL)
    }

    pub fn topics(&self) -> impl Iterator<Item = Topic> + '_ {
        self.repositories.keys().copied()
    }

    pub fn repository(&self, topic: Topic) -> Result<&TopicRepository, RelayError> {
        self.repositories
            .get(&topic)
            .ok_or_else(|| RelayError::UnknownTopic(topic.to_string()))
    }

    /// Store `reading` in its topic's repository and return the new revision.
    pub fn append(&mut self, reading: Reading) -> Result<u64, RelayError> {
        let topic = reading.topic();
        let repository = self
            .repositories
            .get_mut(&topic)
            .ok_or_else(|| RelayError::UnknownTopic(topic.to_string()))?;
        Ok(repository.add(reading))
    }

    pub fn status_of(&self, topic: Topic) -> Result<TopicStatusEntry, RelayError> {
        self.repository(topic).map(status_entry)
    }

    pub fn status(&self) -> Vec<TopicStatusEntry> {
        self.repositories.values().map(status_entry).collect()
    }
}

fn status_entry(repository: &TopicRepository) -> TopicStatusEntry {
    TopicStatusEntry {
        topic: repository.topic(),
        revision: repository.highest_revision(),
        reading: repository.latest().map(|entry| entry.reading.clone()),
    }
}
