//! Outbound delivery
//!
//! Resolves principals, rooms and "everyone" to live connections and queues
//! encoded frames on them. Shared by the router and the built-in handlers.

use super::{RouterError, RouterResult};
use crate::ack::{AckError, AckWaiter};
use crate::connection::{Connection, ConnectionRegistry};
use crate::protocol::encode;
use crate::room::RoomRegistry;
use relay_core::{Message, PrincipalId, Storage};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Copy of a message as delivered to other principals, without the sender's
/// acknowledgment request
pub fn outbound_copy(message: &Message) -> Message {
    let mut outbound = message.clone();
    outbound.ack = false;
    outbound.ack_id = None;
    outbound
}

/// Delivery paths over the live registries
pub struct Delivery {
    connections: Arc<ConnectionRegistry>,
    rooms: Arc<RoomRegistry>,
    storage: Arc<dyn Storage>,
    acks: AckWaiter,
    ack_timeout: Duration,
}

impl Delivery {
    pub fn new(
        connections: Arc<ConnectionRegistry>,
        rooms: Arc<RoomRegistry>,
        storage: Arc<dyn Storage>,
        acks: AckWaiter,
        ack_timeout: Duration,
    ) -> Self {
        Self {
            connections,
            rooms,
            storage,
            acks,
            ack_timeout,
        }
    }

    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    pub fn rooms(&self) -> &Arc<RoomRegistry> {
        &self.rooms
    }

    pub fn acks(&self) -> &AckWaiter {
        &self.acks
    }

    /// Encode and queue a message on a specific connection
    pub async fn send_to_connection(
        &self,
        connection: &Connection,
        message: &Message,
    ) -> RouterResult<()> {
        let frame = encode(message)?;
        connection.send(frame).await?;
        Ok(())
    }

    /// Encode and queue a message for an online principal
    pub async fn try_send_to(&self, principal: &str, message: &Message) -> RouterResult<()> {
        let connection = self
            .connections
            .get(principal)
            .ok_or_else(|| RouterError::NotConnected(principal.to_string()))?;
        self.send_to_connection(&connection, message).await
    }

    /// Deliver to an online principal; false if they are offline or going away
    pub async fn send_to(&self, principal: &str, message: &Message) -> bool {
        match self.try_send_to(principal, message).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(
                    principal_id = %principal,
                    event = %message.event,
                    error = %e,
                    "Direct delivery failed"
                );
                false
            }
        }
    }

    /// Deliver to every online member of a room, returning the delivery count
    pub async fn send_to_room(&self, room: &str, message: &Message, exclude: Option<&str>) -> usize {
        let mut delivered = 0;
        for member in self.rooms.members(room) {
            if Some(member.as_str()) == exclude {
                continue;
            }
            if self.send_to(member.as_str(), message).await {
                delivered += 1;
            }
        }

        tracing::debug!(room = %room, event = %message.event, delivered, "Room delivery");
        delivered
    }

    /// Deliver to every online connection, returning the delivery count
    pub async fn broadcast(&self, message: &Message, exclude: Option<&str>) -> usize {
        let frame = match encode(message) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(event = %message.event, error = %e, "Failed to encode broadcast");
                return 0;
            }
        };

        let mut delivered = 0;
        for connection in self.connections.all() {
            if Some(connection.principal().as_str()) == exclude {
                continue;
            }
            if connection.send(frame.clone()).await.is_ok() {
                delivered += 1;
            }
        }

        tracing::debug!(event = %message.event, delivered, "Broadcast delivery");
        delivered
    }

    /// Deliver to a principal with a server-generated ack request.
    ///
    /// The wait runs on its own task. If the ack does not arrive in time, or
    /// the frame cannot be sent, the message is queued offline for the
    /// receiver instead.
    pub fn send_with_ack(
        self: &Arc<Self>,
        receiver: PrincipalId,
        message: Message,
    ) -> JoinHandle<Result<String, AckError>> {
        let delivery = Arc::clone(self);

        tokio::spawn(async move {
            let result = delivery
                .acks
                .wait(delivery.ack_timeout, |ack_id| {
                    let frame = message.clone().requesting_ack(ack_id);
                    let delivery = Arc::clone(&delivery);
                    let receiver = receiver.clone();
                    async move { delivery.try_send_to(receiver.as_str(), &frame).await }
                })
                .await;

            if let Err(e) = &result {
                tracing::warn!(
                    principal_id = %receiver,
                    event = %message.event,
                    error = %e,
                    "Acknowledged delivery failed, queueing offline"
                );
                delivery.queue_offline(&receiver, &message).await;
            }

            result
        })
    }

    /// Append a message to a receiver's offline queue; failures are logged.
    ///
    /// The whole encoded frame is queued, so a resumed client receives the
    /// same frame shape as live delivery, not the bare `data` payload.
    pub async fn queue_offline(&self, receiver: &PrincipalId, message: &Message) -> bool {
        let payload = match encode(message) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(principal_id = %receiver, error = %e, "Failed to encode offline message");
                return false;
            }
        };

        match self.storage.append_offline_message(receiver, &payload).await {
            Ok(()) => {
                tracing::debug!(principal_id = %receiver, event = %message.event, "Queued offline message");
                true
            }
            Err(e) => {
                tracing::warn!(principal_id = %receiver, error = %e, "Failed to queue offline message");
                false
            }
        }
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("connections", &self.connections)
            .field("rooms", &self.rooms.len())
            .field("ack_timeout", &self.ack_timeout)
            .finish()
    }
}
