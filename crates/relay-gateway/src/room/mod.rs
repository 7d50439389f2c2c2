//! Rooms
//!
//! Named groups of principals used for room-scoped fan-out.

mod registry;
mod room;

pub use registry::{RoomError, RoomRegistry};
pub use room::Room;
