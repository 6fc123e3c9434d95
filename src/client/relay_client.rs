//! Client representation
//!
//! `Client` models one connected peer: its outbound `Connection`, where it
//! stands in the authentication progression and which revision of each
//! topic it has already received.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::broker::topic::Topic;
use crate::client::connection::Connection;
use crate::utils::RelayError;

/// Function a peer announces in its introduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    OrientationControl,
    ManualControl,
    StatusBroadcaster,
    Monitor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::OrientationControl => "orientation-control",
            Role::ManualControl => "manual-control",
            Role::StatusBroadcaster => "status-broadcaster",
            Role::Monitor => "monitor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication progression. States only ever move forward; leaving is
/// done by dropping the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
    RoleAssigned(Role),
}

#[derive(Debug)]
pub struct Client {
    /// Unique identifier used in logs.
    pub id: String,
    connection: Connection,
    state: AuthState,
    subscriptions: HashMap<Topic, u64>,
}

impl Client {
    pub fn new(connection: Connection) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            connection,
            state: AuthState::Unauthenticated,
            subscriptions: HashMap::new(),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self.state, AuthState::Unauthenticated)
    }

    pub fn role(&self) -> Option<Role> {
        match self.state {
            AuthState::RoleAssigned(role) => Some(role),
            _ => None,
        }
    }

    /// Compare `token` against the shared secret. An empty secret never
    /// matches. Authenticating again with the right token keeps the role.
    pub fn authenticate_with(&mut self, token: &str, secret: &str) -> Result<(), RelayError> {
        if secret.is_empty() || token != secret {
            return Err(RelayError::Unauthorized(format!(
                "client {} tried to authenticate with wrong token",
                self.id
            )));
        }
        if self.state == AuthState::Unauthenticated {
            self.state = AuthState::Authenticated;
        }
        Ok(())
    }

    pub fn ensure_authenticated(&self) -> Result<(), RelayError> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(RelayError::Unauthorized(format!(
                "client {} tried to perform unauthenticated action",
                self.id
            )))
        }
    }

    pub fn assign_role(&mut self, role: Role) -> Result<(), RelayError> {
        self.ensure_authenticated()?;
        self.state = AuthState::RoleAssigned(role);
        Ok(())
    }

    /// Last delivered revision for `topic`, if the client follows it.
    pub fn cursor(&self, topic: Topic) -> Option<u64> {
        self.subscriptions.get(&topic).copied()
    }

    pub fn subscriptions(&self) -> &HashMap<Topic, u64> {
        &self.subscriptions
    }

    /// Advance the cursor for `topic`. Older revisions are ignored.
    pub fn record_subscription_cursor(&mut self, topic: Topic, revision: u64) {
        let cursor = self.subscriptions.entry(topic).or_insert(0);
        if revision > *cursor {
            *cursor = revision;
        }
    }

    /// Swap the whole cursor set for the one the peer reported.
    pub fn replace_subscriptions(&mut self, cursors: impl IntoIterator<Item = (Topic, u64)>) {
        self.subscriptions = cursors.into_iter().collect();
    }
}
