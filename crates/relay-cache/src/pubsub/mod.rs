//! Redis Pub/Sub module.
//!
//! Publish side only; topics mirror the routing target of each message.

mod channels;
mod publisher;

pub use channels::{PubSubChannel, BROADCAST_CHANNEL, ROOM_CHANNEL_PREFIX, USER_CHANNEL_PREFIX};
pub use publisher::Publisher;
