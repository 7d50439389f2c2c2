//! Message router
//!
//! Per inbound frame: decode, resolve acks, stamp the sender, persist and
//! publish best-effort, queue offline for absent direct receivers, dispatch,
//! then acknowledge the sender if asked. Also owns the connect, resume and
//! disconnect paths.

use super::{outbound_copy, Delivery, RouterError, RouterResult};
use crate::ack::AckWaiter;
use crate::connection::{Connection, ConnectionRegistry};
use crate::dispatch::EventDispatcher;
use crate::handlers::register_defaults;
use crate::protocol::{decode, encode, error_frame, CloseCode, DecodeError};
use crate::room::RoomRegistry;
use relay_cache::PubSubChannel;
use relay_common::{DuplicateLoginPolicy, RelayConfig};
use relay_core::{Broker, Message, MessageTarget, PrincipalId, Storage, ACK_EVENT};
use std::sync::Arc;

/// Routes frames between connections, rooms, storage and the broker
pub struct MessageRouter {
    connections: Arc<ConnectionRegistry>,
    rooms: Arc<RoomRegistry>,
    dispatcher: Arc<EventDispatcher>,
    delivery: Arc<Delivery>,
    storage: Arc<dyn Storage>,
    broker: Arc<dyn Broker>,
    acks: AckWaiter,
    duplicate_login: DuplicateLoginPolicy,
    topic_prefix: String,
}

impl MessageRouter {
    /// Create a router with the built-in handlers registered
    pub fn new(storage: Arc<dyn Storage>, broker: Arc<dyn Broker>, config: &RelayConfig) -> Self {
        let connections = ConnectionRegistry::new_shared();
        let rooms = RoomRegistry::new_shared();
        let acks = AckWaiter::new();
        let delivery = Arc::new(Delivery::new(
            connections.clone(),
            rooms.clone(),
            storage.clone(),
            acks.clone(),
            config.ack_timeout(),
        ));

        let dispatcher = EventDispatcher::new_shared();
        register_defaults(&dispatcher, &delivery);

        Self {
            connections,
            rooms,
            dispatcher,
            delivery,
            storage,
            broker,
            acks,
            duplicate_login: config.duplicate_login,
            topic_prefix: config.topic_prefix.clone(),
        }
    }

    /// Create a router wrapped in Arc
    pub fn new_shared(
        storage: Arc<dyn Storage>,
        broker: Arc<dyn Broker>,
        config: &RelayConfig,
    ) -> Arc<Self> {
        Arc::new(Self::new(storage, broker, config))
    }

    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    pub fn rooms(&self) -> &Arc<RoomRegistry> {
        &self.rooms
    }

    /// Handler table, for registering application handlers
    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    pub fn delivery(&self) -> &Arc<Delivery> {
        &self.delivery
    }

    pub fn acks(&self) -> &AckWaiter {
        &self.acks
    }

    /// Register a connection and make it routable.
    ///
    /// Under the replace policy a live connection for the same principal is
    /// closed with `Replaced`; under the reject policy the new connection is
    /// refused. With `resume` set, the principal's offline queue is drained
    /// onto the new connection; the number of delivered payloads is returned.
    pub async fn connect(&self, connection: &Arc<Connection>, resume: bool) -> RouterResult<usize> {
        match self.duplicate_login {
            DuplicateLoginPolicy::Replace => {
                if let Some(previous) = self.connections.add(connection.clone()) {
                    if !Arc::ptr_eq(&previous, connection) {
                        tracing::info!(
                            principal_id = %connection.principal(),
                            previous_session = %previous.session_id(),
                            "Replacing existing connection"
                        );
                        previous.close(CloseCode::Replaced).ok();
                    }
                }
            }
            DuplicateLoginPolicy::Reject => {
                if let Err(existing) = self.connections.try_add(connection.clone()) {
                    tracing::info!(
                        principal_id = %connection.principal(),
                        existing_session = %existing.session_id(),
                        "Rejecting duplicate login"
                    );
                    return Err(RouterError::AlreadyConnected(connection.principal().clone()));
                }
            }
        }

        connection.activate();
        tracing::info!(
            principal_id = %connection.principal(),
            session_id = %connection.session_id(),
            resume,
            "Connection active"
        );

        if resume {
            return Ok(self.drain_offline(connection).await);
        }
        Ok(0)
    }

    /// Deliver a principal's offline queue in insertion order, then remove
    /// the delivered payloads.
    ///
    /// Payloads queued while the drain runs stay for the next resume. A
    /// failed send stops the drain and keeps the queue, so delivery is
    /// at-least-once.
    pub async fn drain_offline(&self, connection: &Arc<Connection>) -> usize {
        let principal = connection.principal();

        let payloads = match self.storage.get_offline_messages(principal).await {
            Ok(payloads) => payloads,
            Err(e) => {
                tracing::warn!(principal_id = %principal, error = %e, "Failed to read offline queue");
                return 0;
            }
        };
        if payloads.is_empty() {
            return 0;
        }

        let total = payloads.len();
        for (delivered, payload) in payloads.into_iter().enumerate() {
            if let Err(e) = connection.send(payload).await {
                tracing::warn!(
                    principal_id = %principal,
                    delivered,
                    total,
                    error = %e,
                    "Offline drain interrupted, keeping queue"
                );
                return delivered;
            }
        }

        if let Err(e) = self.storage.trim_offline_messages(principal, total).await {
            tracing::warn!(principal_id = %principal, error = %e, "Failed to trim offline queue");
        }

        tracing::info!(principal_id = %principal, count = total, "Offline queue delivered");
        total
    }

    /// Process one inbound text frame from a connection.
    ///
    /// A decode error means the frame was dropped; the connection stays open.
    pub async fn handle_frame(&self, connection: &Arc<Connection>, text: &str) -> Result<(), DecodeError> {
        let mut message = decode(text)?;

        if message.event == ACK_EVENT {
            match message.ack_id.as_deref() {
                Some(ack_id) => {
                    self.acks.receive(ack_id);
                }
                None => {
                    tracing::debug!(session_id = %connection.session_id(), "Ack frame without ack_id dropped");
                }
            }
            return Ok(());
        }

        message.sender_id = Some(connection.principal().clone());
        let message = Arc::new(message);

        tracing::trace!(
            session_id = %connection.session_id(),
            event = %message.event,
            "Frame received"
        );

        self.persist(&message).await;
        self.publish(&message).await;

        if let MessageTarget::Direct(receiver) = message.target() {
            if !self.connections.contains(receiver.as_str()) {
                self.delivery
                    .queue_offline(receiver, &outbound_copy(&message))
                    .await;
            }
        }

        if let Err(e) = self.dispatcher.dispatch(connection, message.clone()).await {
            tracing::warn!(
                session_id = %connection.session_id(),
                event = %message.event,
                error = %e,
                "Handler error"
            );
            let reply = error_frame(e.code(), e.to_string(), Some(&message.event));
            self.reply(connection, &reply).await;
        }

        if message.wants_ack() {
            if let Some(ack_id) = &message.ack_id {
                self.reply(connection, &Message::ack_frame(ack_id.clone())).await;
            }
        }

        Ok(())
    }

    /// Tear down a connection; idempotent.
    ///
    /// Only removes the registry entry if it still belongs to this
    /// connection. Returns whether it did.
    pub fn disconnect(&self, connection: &Arc<Connection>) -> bool {
        connection.begin_close();
        let removed = self.connections.remove_connection(connection);
        connection.mark_closed();

        if removed {
            tracing::info!(
                principal_id = %connection.principal(),
                session_id = %connection.session_id(),
                "Connection closed"
            );
        }
        removed
    }

    /// Send a raw text frame to an online principal
    pub async fn send_to_user(&self, principal: &str, frame: String) -> RouterResult<()> {
        let connection = self
            .connections
            .get(principal)
            .ok_or_else(|| RouterError::NotConnected(principal.to_string()))?;
        connection.send(frame).await?;
        Ok(())
    }

    /// Administratively close a principal's connection
    pub fn close_user(&self, principal: &str) -> RouterResult<()> {
        let connection = self
            .connections
            .get(principal)
            .ok_or_else(|| RouterError::NotConnected(principal.to_string()))?;

        tracing::info!(principal_id = %principal, "Closing connection on request");
        connection.close(CloseCode::Kicked)?;
        Ok(())
    }

    /// Online principals, sorted
    pub fn online_users(&self) -> Vec<PrincipalId> {
        let mut ids = self.connections.ids();
        ids.sort();
        ids
    }

    /// Close every connection and cancel pending ack waits
    pub fn shutdown(&self) -> usize {
        let closed = self.connections.close_all(CloseCode::Shutdown);
        self.acks.clear();
        closed
    }

    async fn persist(&self, message: &Message) {
        if let Err(e) = self.storage.store_message(message).await {
            tracing::warn!(event = %message.event, error = %e, "Failed to persist message");
        }
    }

    async fn publish(&self, message: &Message) {
        let topic = PubSubChannel::for_message(message).topic(&self.topic_prefix);
        let payload = match encode(message) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(event = %message.event, error = %e, "Failed to encode message for broker");
                return;
            }
        };

        if let Err(e) = self.broker.publish(&topic, &payload).await {
            tracing::warn!(topic = %topic, error = %e, "Failed to publish message");
        }
    }

    async fn reply(&self, connection: &Connection, message: &Message) {
        if let Err(e) = self.delivery.send_to_connection(connection, message).await {
            tracing::debug!(
                session_id = %connection.session_id(),
                event = %message.event,
                error = %e,
                "Failed to reply to sender"
            );
        }
    }
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("connections", &self.connections)
            .field("rooms", &self.rooms.len())
            .field("dispatcher", &self.dispatcher)
            .field("acks", &self.acks)
            .field("duplicate_login", &self.duplicate_login)
            .finish()
    }
}
