//! Repository implementations

mod message;

pub use message::PgMessageRepository;
