//! Domain entities - core business objects

mod message;

pub use message::{Message, MessageFilter, MessageTarget, ACK_EVENT};
