//! Room membership handlers
//!
//! The room is named by the frame's `room_id`.

use crate::connection::Connection;
use crate::dispatch::{HandlerError, HandlerResult};
use crate::router::Delivery;
use relay_core::Message;
use std::sync::Arc;

fn room_name(message: &Message) -> HandlerResult<&str> {
    message
        .room_id
        .as_deref()
        .ok_or_else(|| HandlerError::InvalidPayload("room_id is required".to_string()))
}

/// Join a room, creating it on first reference
pub async fn handle_join(
    delivery: Arc<Delivery>,
    connection: Arc<Connection>,
    message: Arc<Message>,
) -> HandlerResult<()> {
    let room = room_name(&message)?;
    let joined = delivery
        .rooms()
        .get_or_create(room)
        .add_member(connection.principal().clone());

    tracing::debug!(principal_id = %connection.principal(), room = %room, joined, "Join");
    Ok(())
}

/// Leave a room; no-op if the room does not exist
pub async fn handle_leave(
    delivery: Arc<Delivery>,
    connection: Arc<Connection>,
    message: Arc<Message>,
) -> HandlerResult<()> {
    let room = room_name(&message)?;
    let left = delivery
        .rooms()
        .remove_member(room, connection.principal().as_str());

    tracing::debug!(principal_id = %connection.principal(), room = %room, left, "Leave");
    Ok(())
}

/// Create a room; fails if the name is taken
pub async fn handle_room_create(
    delivery: Arc<Delivery>,
    _connection: Arc<Connection>,
    message: Arc<Message>,
) -> HandlerResult<()> {
    delivery.rooms().create_room(room_name(&message)?)?;
    Ok(())
}

/// Delete a room; a missing room is a no-op
pub async fn handle_room_delete(
    delivery: Arc<Delivery>,
    _connection: Arc<Connection>,
    message: Arc<Message>,
) -> HandlerResult<()> {
    delivery.rooms().delete_room(room_name(&message)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ack::AckWaiter;
    use crate::connection::ConnectionRegistry;
    use crate::room::RoomRegistry;
    use relay_core::{MemoryStorage, PrincipalId};
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn setup() -> (Arc<Delivery>, Arc<Connection>) {
        let delivery = Arc::new(Delivery::new(
            ConnectionRegistry::new_shared(),
            RoomRegistry::new_shared(),
            Arc::new(MemoryStorage::new()),
            AckWaiter::new(),
            Duration::from_secs(5),
        ));
        let (tx, _rx) = mpsc::channel(4);
        (delivery, Connection::new(PrincipalId::from("u1"), tx))
    }

    fn room_frame(event: &str, room: &str) -> Arc<Message> {
        Arc::new(Message::new(event, json!(null)).with_room(room))
    }

    #[tokio::test]
    async fn test_join_then_leave() {
        let (d, conn) = setup();

        handle_join(d.clone(), conn.clone(), room_frame("join", "r"))
            .await
            .unwrap();
        handle_join(d.clone(), conn.clone(), room_frame("join", "r"))
            .await
            .unwrap();
        assert_eq!(d.rooms().members("r"), vec![PrincipalId::from("u1")]);

        handle_leave(d.clone(), conn, room_frame("leave", "r"))
            .await
            .unwrap();
        assert!(d.rooms().members("r").is_empty());
    }

    #[tokio::test]
    async fn test_leave_absent_room_is_noop() {
        let (d, conn) = setup();
        handle_leave(d.clone(), conn, room_frame("leave", "ghost"))
            .await
            .unwrap();
        assert!(d.rooms().is_empty());
    }

    #[tokio::test]
    async fn test_join_requires_room_id() {
        let (d, conn) = setup();
        let err = handle_join(d, conn, Arc::new(Message::new("join", json!(null))))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_PAYLOAD");
    }

    #[tokio::test]
    async fn test_create_and_delete_room() {
        let (d, conn) = setup();

        handle_room_create(d.clone(), conn.clone(), room_frame("room.create", "r"))
            .await
            .unwrap();
        let err = handle_room_create(d.clone(), conn.clone(), room_frame("room.create", "r"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "room already exists");

        handle_room_delete(d.clone(), conn, room_frame("room.delete", "r"))
            .await
            .unwrap();
        assert!(d.rooms().get_room("r").is_none());
    }
}
