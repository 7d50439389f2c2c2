//! Database models with SQLx `FromRow` derives

mod message;

pub use message::MessageModel;
