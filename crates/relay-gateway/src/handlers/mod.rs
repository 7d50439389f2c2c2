//! Built-in event handlers
//!
//! Registered by [`register_defaults`]; applications can replace any of them
//! through [`EventDispatcher::register`].

mod chat;
mod room;

pub use chat::{handle_broadcast, handle_chat};
pub use room::{handle_join, handle_leave, handle_room_create, handle_room_delete};

use crate::dispatch::EventDispatcher;
use crate::router::Delivery;
use std::sync::Arc;

/// Direct, room or broadcast chat message
pub const CHAT_EVENT: &str = "chat";
/// Message to every online principal
pub const BROADCAST_EVENT: &str = "broadcast";
/// Join a room, creating it on first reference
pub const JOIN_EVENT: &str = "join";
/// Leave a room
pub const LEAVE_EVENT: &str = "leave";
/// Create a room explicitly
pub const ROOM_CREATE_EVENT: &str = "room.create";
/// Delete a room
pub const ROOM_DELETE_EVENT: &str = "room.delete";

/// Register the built-in handlers on a dispatcher
pub fn register_defaults(dispatcher: &EventDispatcher, delivery: &Arc<Delivery>) {
    let d = delivery.clone();
    dispatcher.register(CHAT_EVENT, move |conn, msg| handle_chat(d.clone(), conn, msg));

    let d = delivery.clone();
    dispatcher.register(BROADCAST_EVENT, move |conn, msg| {
        handle_broadcast(d.clone(), conn, msg)
    });

    let d = delivery.clone();
    dispatcher.register(JOIN_EVENT, move |conn, msg| handle_join(d.clone(), conn, msg));

    let d = delivery.clone();
    dispatcher.register(LEAVE_EVENT, move |conn, msg| handle_leave(d.clone(), conn, msg));

    let d = delivery.clone();
    dispatcher.register(ROOM_CREATE_EVENT, move |conn, msg| {
        handle_room_create(d.clone(), conn, msg)
    });

    let d = delivery.clone();
    dispatcher.register(ROOM_DELETE_EVENT, move |conn, msg| {
        handle_room_delete(d.clone(), conn, msg)
    });
}
