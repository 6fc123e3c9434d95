//! Broker engine
//!
//! The `Broker` owns every piece of shared relay state: the active clients,
//! the topic repositories and each client's subscription cursors. For every
//! inbound payload it decodes, enforces authentication, dispatches on the
//! message kind and, after state changes, runs a fulfillment cycle that
//! pushes each client the revisions it has not seen yet.
//!
//! Concurrency and usage notes:
//! - The API is synchronous and meant to sit behind one lock
//!   (`Arc<Mutex<Broker>>`). Each payload is processed to completion under
//!   that lock, which gives all mutations a total order.
//! - Outbound frames go into unbounded per-connection channels, so nothing
//!   here waits on network I/O while the lock is held.
//! - Errors from a single payload are logged in `handle_payload` and never
//!   escape; a bad peer only ever costs its own connection.

use std::collections::BTreeMap;

use tracing::{debug, error, info, warn};

use crate::broker::message::{ControlKind, Message, MessageKind, Reading, SubscriptionCursor};
use crate::broker::registry::TopicStatusRegistry;
use crate::broker::topic::Topic;
use crate::client::{Client, Connection, ConnectionId, Role};
use crate::transport::decoder::MessageDecoder;
use crate::transport::message::ServerMessage;
use crate::utils::RelayError;

#[derive(Debug)]
pub struct Broker {
    auth_token: String,
    decoder: MessageDecoder,
    registry: TopicStatusRegistry,
    clients: BTreeMap<ConnectionId, Client>,
}

impl Broker {
    /// Build a broker from its collaborators. `auth_token` is the shared
    /// secret peers must present; an empty secret rejects everyone.
    pub fn new(
        auth_token: impl Into<String>,
        decoder: MessageDecoder,
        registry: TopicStatusRegistry,
    ) -> Self {
        Self {
            auth_token: auth_token.into(),
            decoder,
            registry,
            clients: BTreeMap::new(),
        }
    }

    /// Create a client for a freshly accepted connection and return its id.
    ///
    /// A connection is only ever registered once; registering it again
    /// keeps the existing client.
    pub fn register_client(&mut self, connection: Connection) -> String {
        let connection_id = connection.id();
        if let Some(existing) = self.clients.get(&connection_id) {
            warn!(connection = %connection_id, client = %existing.id, "connection already registered");
            return existing.id.clone();
        }
        let client = Client::new(connection);
        let client_id = client.id.clone();
        self.clients.insert(connection_id, client);
        client_id
    }

    /// Drop the client of a connection the peer has closed.
    pub fn remove_client(&mut self, connection: ConnectionId) -> Option<Client> {
        self.clients.remove(&connection)
    }

    pub fn client(&self, connection: ConnectionId) -> Option<&Client> {
        self.clients.get(&connection)
    }

    pub fn is_connected(&self, connection: ConnectionId) -> bool {
        self.clients.contains_key(&connection)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn registry(&self) -> &TopicStatusRegistry {
        &self.registry
    }

    /// Process one inbound payload, logging instead of returning any error.
    ///
    /// The client id is captured up front: a forced disconnect removes the
    /// client before the error reaches this point.
    pub fn handle_payload(&mut self, connection: ConnectionId, raw: &str) {
        let client_id = self.clients.get(&connection).map(|c| c.id.clone());
        if let Err(e) = self.process(connection, raw) {
            let client = client_id.as_deref().unwrap_or("-");
            match e {
                RelayError::UnknownTopic(_) => {
                    error!(connection = %connection, client, error = %e, "inconsistent topic state")
                }
                RelayError::Decode(_) => {
                    let preview: String = raw.chars().take(100).collect();
                    warn!(connection = %connection, client, error = %e, payload = %preview, "dropping message")
                }
                _ => warn!(connection = %connection, client, error = %e, "dropping message"),
            }
        }
    }

    /// Decode and dispatch one payload from `connection`.
    pub fn process(&mut self, connection: ConnectionId, raw: &str) -> Result<(), RelayError> {
        if !self.clients.contains_key(&connection) {
            return Err(RelayError::UnknownClient(connection));
        }
        let message = self.decoder.decode(raw, connection)?;
        self.dispatch(message)
    }

    fn dispatch(&mut self, message: Message) -> Result<(), RelayError> {
        let sender = message.sender;
        match message.kind {
            MessageKind::Authentication { token } => self.handle_authentication(sender, &token),
            MessageKind::Introduction { role } => self.handle_introduction(sender, role),
            MessageKind::Report(reading) => self.handle_report(sender, reading),
            MessageKind::RequestTopicStatus => self.handle_topic_status_request(sender),
            MessageKind::SubscriptionStatus { subscriptions } => {
                self.handle_subscription_status(sender, subscriptions)
            }
            MessageKind::Control { command, raw } => self.handle_control(sender, command, &raw),
        }
    }

    fn handle_authentication(&mut self, sender: ConnectionId, token: &str) -> Result<(), RelayError> {
        let client = self
            .clients
            .get_mut(&sender)
            .ok_or(RelayError::UnknownClient(sender))?;
        match client.authenticate_with(token, &self.auth_token) {
            Ok(()) => {
                info!(connection = %sender, client = %client.id, "client authenticated");
                Ok(())
            }
            Err(e) => {
                self.disconnect_client(sender, &e);
                Err(e)
            }
        }
    }

    fn handle_introduction(&mut self, sender: ConnectionId, role: Role) -> Result<(), RelayError> {
        self.require_authenticated(sender)?;
        let client = self
            .clients
            .get_mut(&sender)
            .ok_or(RelayError::UnknownClient(sender))?;
        client.assign_role(role)?;
        info!(connection = %sender, client = %client.id, %role, "client introduced");
        Ok(())
    }

    fn handle_report(&mut self, sender: ConnectionId, reading: Reading) -> Result<(), RelayError> {
        let topic = reading.topic();
        let revision = self.registry.append(reading)?;
        debug!(connection = %sender, %topic, revision, "stored reading");
        self.fulfill_subscriptions();
        Ok(())
    }

    fn handle_control(
        &mut self,
        sender: ConnectionId,
        command: ControlKind,
        raw: &str,
    ) -> Result<(), RelayError> {
        let target = command.target_role();
        let Some(recipient) = self.clients.values().find(|c| c.role() == Some(target)) else {
            debug!(connection = %sender, role = %target, "no role holder connected, dropping command");
            return Ok(());
        };
        if let Err(e) = recipient.connection().send(raw) {
            warn!(connection = %sender, recipient = %recipient.id, error = %e, "failed to forward command");
        } else {
            debug!(connection = %sender, recipient = %recipient.id, role = %target, "forwarded command");
        }
        Ok(())
    }

    fn handle_topic_status_request(&mut self, sender: ConnectionId) -> Result<(), RelayError> {
        self.require_authenticated(sender)?;
        let client = self
            .clients
            .get(&sender)
            .ok_or(RelayError::UnknownClient(sender))?;
        client
            .connection()
            .send_message(&ServerMessage::topic_status(&self.registry))
    }

    fn handle_subscription_status(
        &mut self,
        sender: ConnectionId,
        subscriptions: Vec<SubscriptionCursor>,
    ) -> Result<(), RelayError> {
        self.require_authenticated(sender)?;
        let cursors = subscriptions
            .into_iter()
            .map(|s| -> Result<(Topic, u64), RelayError> {
                let highest = self.registry.repository(s.topic)?.highest_revision();
                Ok((s.topic, s.revision.min(highest)))
            })
            .collect::<Result<Vec<(Topic, u64)>, RelayError>>()?;
        let client = self
            .clients
            .get_mut(&sender)
            .ok_or(RelayError::UnknownClient(sender))?;
        debug!(connection = %sender, client = %client.id, topics = cursors.len(), "replacing subscriptions");
        client.replace_subscriptions(cursors);
        self.fulfill_subscriptions();
        Ok(())
    }

    /// Push every client the revisions past its cursors, one message per
    /// entry, and return how many messages went out.
    ///
    /// A failed send stops delivery for that (client, topic) pair without
    /// advancing its cursor, so the entry is retried on the next cycle.
    pub fn fulfill_subscriptions(&mut self) -> usize {
        let mut delivered = 0;
        for (connection, client) in self.clients.iter_mut() {
            let cursors: Vec<(Topic, u64)> = client
                .subscriptions()
                .iter()
                .map(|(topic, revision)| (*topic, *revision))
                .collect();
            for (topic, cursor) in cursors {
                let repository = match self.registry.repository(topic) {
                    Ok(repository) => repository,
                    Err(e) => {
                        error!(connection = %connection, client = %client.id, error = %e, "subscription to unregistered topic");
                        continue;
                    }
                };
                for entry in repository.get(cursor + 1) {
                    let update = ServerMessage::TopicUpdate {
                        topic,
                        revision: entry.revision,
                        received_at: entry.received_at,
                        reading: entry.reading.clone(),
                    };
                    if let Err(e) = client.connection().send_message(&update) {
                        warn!(connection = %connection, client = %client.id, %topic, error = %e, "failed to deliver update");
                        break;
                    }
                    client.record_subscription_cursor(topic, entry.revision);
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Disconnect `sender` unless it has authenticated.
    fn require_authenticated(&mut self, sender: ConnectionId) -> Result<(), RelayError> {
        let client = self
            .clients
            .get(&sender)
            .ok_or(RelayError::UnknownClient(sender))?;
        if let Err(e) = client.ensure_authenticated() {
            self.disconnect_client(sender, &e);
            return Err(e);
        }
        Ok(())
    }

    /// Force a client off the relay: tell it why, close it, forget it.
    fn disconnect_client(&mut self, connection: ConnectionId, reason: &RelayError) {
        let Some(client) = self.clients.remove(&connection) else {
            return;
        };
        let notice = ServerMessage::Error {
            message: reason.to_string(),
        };
        if let Err(e) = client.connection().send_message(&notice) {
            debug!(connection = %connection, error = %e, "could not send disconnect reason");
        }
        client.connection().close();
        warn!(connection = %connection, client = %client.id, reason = %reason, "disconnected client");
    }
}
