//! Chat and broadcast handlers

use crate::connection::Connection;
use crate::dispatch::HandlerResult;
use crate::router::{outbound_copy, Delivery};
use relay_core::{Message, MessageTarget};
use std::sync::Arc;

/// Deliver a chat message to its receiver, its room, or everyone else.
///
/// A direct message to an offline receiver was already queued by the router.
/// With `ack` set, the receiver is asked to acknowledge and the wait runs on
/// its own task.
pub async fn handle_chat(
    delivery: Arc<Delivery>,
    connection: Arc<Connection>,
    message: Arc<Message>,
) -> HandlerResult<()> {
    let sender = connection.principal().as_str();
    let outbound = outbound_copy(&message);

    match message.target() {
        MessageTarget::Direct(receiver) => {
            if !delivery.connections().contains(receiver.as_str()) {
                return Ok(());
            }

            if message.ack {
                delivery.send_with_ack(receiver.clone(), outbound);
            } else if !delivery.send_to(receiver.as_str(), &outbound).await {
                delivery.queue_offline(receiver, &outbound).await;
            }
        }
        MessageTarget::Room(room) => {
            delivery.send_to_room(room, &outbound, Some(sender)).await;
        }
        MessageTarget::Broadcast => {
            delivery.broadcast(&outbound, Some(sender)).await;
        }
    }

    Ok(())
}

/// Deliver to every online principal except the sender
pub async fn handle_broadcast(
    delivery: Arc<Delivery>,
    connection: Arc<Connection>,
    message: Arc<Message>,
) -> HandlerResult<()> {
    let outbound = outbound_copy(&message);
    delivery
        .broadcast(&outbound, Some(connection.principal().as_str()))
        .await;
    Ok(())
}
